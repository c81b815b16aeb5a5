use serde_json::json;
use shared_types::{
    CaseRoster, CpsFormSubmission, CpsFormType, CpsResolution, FormDefendant, MatchKey,
    ProblemCode, RosterDefendant, Visibility,
};
use uuid::Uuid;

use crate::common::{self, TestEngine};

const ANN_ASN: &str = "0101ZZ0000000000001A";
const BOB_ASN: &str = "0101ZZ0000000000002B";

async fn two_defendant_case(t: &TestEngine, urn: &str) -> Uuid {
    let case_id = Uuid::new_v4();
    let mut ann = common::person("REF-1", "Ann", "Smith", "1990-02-03");
    ann["asn"] = json!(ANN_ASN);
    let mut bob = common::person("REF-2", "Bob", "Jones", "1985-06-01");
    bob["asn"] = json!(BOB_ASN);
    bob["cps_defendant_id"] = json!("CPS-2");
    t.engine
        .submit_prosecution(common::prosecution(case_id, urn, "C", vec![ann, bob]))
        .await
        .unwrap();
    t.sink.clear();
    case_id
}

fn form(form_type: CpsFormType, urn: &str, defendants: Vec<FormDefendant>) -> CpsFormSubmission {
    CpsFormSubmission {
        submission_id: Uuid::new_v4(),
        form_type,
        urn: urn.to_string(),
        defendants,
        form_data: json!({"witnesses": 2}),
    }
}

fn by_asn(asn: &str) -> FormDefendant {
    FormDefendant {
        asn: Some(asn.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_one_unmatched_defendant_rejects_the_form() {
    let t = common::test_engine();
    let case_id = two_defendant_case(&t, "TVL900").await;
    let submission = form(
        CpsFormType::Pet,
        "TVL900",
        vec![by_asn(ANN_ASN), by_asn("9999ZZ0000000000009Z")],
    );
    let submission_id = submission.submission_id;

    let record = t.engine.submit_cps_form(submission).await.unwrap();
    assert_eq!(record.resolution, CpsResolution::Rejected);
    assert_eq!(record.case_id, Some(case_id));
    assert_eq!(record.problems.len(), 1);
    assert_eq!(record.problems[0].code, ProblemCode::InvalidDefendantsProvided);
    assert_eq!(record.problems[0].value("asn"), Some("9999ZZ0000000000009Z"));

    assert_eq!(
        t.sink.names(),
        vec![
            "cps-serve.pet.received",
            "cps-serve.material-status-updated",
            "public.cps-serve.material-status-updated",
        ]
    );
    let status = t.sink.named("public.cps-serve.material-status-updated");
    assert_eq!(status[0].payload["status"], "REJECTED");
    assert_eq!(status[0].payload["errors"].as_array().unwrap().len(), 1);
    assert!(t
        .sink
        .events()
        .iter()
        .all(|e| e.correlation_id == submission_id));
    assert!(t.sink.named("cps-serve.pet.submitted").is_empty());
}

#[tokio::test]
async fn test_fully_matched_form_is_submitted() {
    let t = common::test_engine();
    let case_id = two_defendant_case(&t, "TVL901").await;
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    let ann = case.defendant_by_reference("REF-1").unwrap().id;
    let bob = case.defendant_by_reference("REF-2").unwrap().id;

    let record = t
        .engine
        .submit_cps_form(form(
            CpsFormType::Bcm,
            "tvl901",
            vec![
                FormDefendant {
                    cps_defendant_id: Some("CPS-2".into()),
                    ..Default::default()
                },
                FormDefendant {
                    forename: Some("ANN".into()),
                    surname: Some(" smith ".into()),
                    date_of_birth: Some(common::date("1990-02-03")),
                    ..Default::default()
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(record.resolution, CpsResolution::Submitted);
    assert!(record.problems.is_empty());
    assert_eq!(record.matches.matched.len(), 2);
    assert_eq!(record.matches.matched[0].defendant_id, bob);
    assert_eq!(
        record.matches.matched[0].key,
        MatchKey::ExternalId("CPS-2".into())
    );
    assert_eq!(record.matches.matched[1].defendant_id, ann);

    let submitted = t.sink.named("public.cps-serve.bcm.submitted");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].case_id, Some(case_id));
    assert_eq!(submitted[0].payload["formData"]["witnesses"], 2);
    let status = t.sink.named("public.cps-serve.material-status-updated");
    assert_eq!(status[0].payload["status"], "SUCCESS");

    let received = t.sink.named("cps-serve.bcm.received");
    assert_eq!(received[0].visibility, Visibility::Internal);
    assert!(t.sink.named("public.cps-serve.bcm.received").is_empty());
}

#[tokio::test]
async fn test_roster_falls_back_to_case_management() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let defendant_id = Uuid::new_v4();
    t.cms.add_roster(CaseRoster {
        case_id,
        urn: "TVL902".into(),
        defendants: vec![RosterDefendant {
            defendant_id,
            prosecutor_reference: None,
            asn: Some(ANN_ASN.into()),
            cps_defendant_id: None,
            forename: None,
            surname: None,
            date_of_birth: None,
            organisation_name: None,
        }],
    });

    let record = t
        .engine
        .submit_cps_form(form(
            CpsFormType::Cotr,
            "TVL902",
            vec![by_asn("0101ZZ 0000000000001A")],
        ))
        .await
        .unwrap();
    assert_eq!(record.resolution, CpsResolution::Submitted);
    assert_eq!(record.case_id, Some(case_id));
    assert_eq!(record.matches.matched[0].defendant_id, defendant_id);
}

#[tokio::test]
async fn test_form_without_case_is_unresolved() {
    let t = common::test_engine();
    let record = t
        .engine
        .submit_cps_form(form(CpsFormType::Ptph, "TVL903", vec![by_asn(ANN_ASN)]))
        .await
        .unwrap();
    assert_eq!(record.resolution, CpsResolution::Unresolved);
    assert!(record.case_id.is_none());
    assert_eq!(t.sink.names(), vec!["cps-serve.ptph.received"]);
}

#[tokio::test]
async fn test_form_redelivery_replays() {
    let t = common::test_engine();
    two_defendant_case(&t, "TVL904").await;
    let submission = form(CpsFormType::Pet, "TVL904", vec![by_asn(BOB_ASN)]);
    let submission_id = submission.submission_id;

    let first = t.engine.submit_cps_form(submission.clone()).await.unwrap();
    let again = t.engine.submit_cps_form(submission).await.unwrap();
    assert_eq!(again, first);
    assert_eq!(t.sink.named("public.cps-serve.pet.submitted").len(), 2);
    assert_eq!(
        t.engine.get_cps_submission(submission_id).unwrap(),
        Some(first)
    );
}

#[tokio::test]
async fn test_form_without_defendants_is_structural() {
    let t = common::test_engine();
    let err = t
        .engine
        .submit_cps_form(form(CpsFormType::Pet, "TVL905", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, shared_types::AppErrorKind::Structural);
    assert!(t.sink.events().is_empty());
}
