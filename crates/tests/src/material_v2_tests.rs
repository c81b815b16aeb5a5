use shared_types::{
    MaterialDefendant, MaterialStatus, PendingReason, PersonalInformation, ProblemCode, Scope,
    SubmitMaterialV2Request,
};
use uuid::Uuid;

use crate::common;

fn v2(urn: &str, defendant: MaterialDefendant) -> SubmitMaterialV2Request {
    SubmitMaterialV2Request {
        material_id: Uuid::new_v4(),
        urn: urn.to_string(),
        defendant,
        document_type: "CASE_FILE".to_string(),
        file_name: "statement.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        file_handle: format!("blob-{}", Uuid::new_v4()),
        timer_class: Default::default(),
    }
}

fn ann(forename: &str) -> PersonalInformation {
    PersonalInformation {
        forename: forename.to_string(),
        surname: "SMITH".to_string(),
        date_of_birth: common::date("1990-02-03"),
    }
}

async fn accepted(t: &common::TestEngine, urn: &str) -> Uuid {
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::clean_prosecution(case_id, urn))
        .await
        .unwrap();
    case_id
}

#[tokio::test]
async fn test_defendant_details_are_required() {
    let t = common::test_engine();
    accepted(&t, "TVL700").await;

    let outcome = t
        .engine
        .submit_material_v2(v2("TVL700", MaterialDefendant::default()))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Rejected);
    assert_eq!(outcome.problems[0].code, ProblemCode::DefendantDetailsRequired);
    assert_eq!(t.scheduler.armed_count(), 0);
}

#[tokio::test]
async fn test_reference_only_warns_about_missing_personal_information() {
    let t = common::test_engine();
    let case_id = accepted(&t, "TVL701").await;
    let defendant_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    let outcome = t
        .engine
        .submit_material_v2(v2("TVL701", MaterialDefendant::by_reference("REF-1")))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Added);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(
        outcome.warnings[0].code,
        ProblemCode::DefendantPersonalInformationMissing
    );
    assert_eq!(
        outcome.warnings[0].value("prosecutorDefendantReference"),
        Some("REF-1")
    );

    let material = t.engine.get_material(outcome.material_id).unwrap().unwrap();
    assert_eq!(material.defendant_id, Some(defendant_id));
    let added = t.sink.named("public.material.added");
    assert_eq!(added[0].payload["warnings"][0]["code"], "DEFENDANT_PERSONAL_INFORMATION_MISSING");
}

#[tokio::test]
async fn test_personal_information_match_is_reported() {
    let t = common::test_engine();
    let case_id = accepted(&t, "TVL702").await;
    let defendant_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    let outcome = t
        .engine
        .submit_material_v2(v2(
            "TVL702",
            MaterialDefendant {
                prosecutor_reference: None,
                personal_information: Some(ann("  ann ")),
            },
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Added);
    assert_eq!(outcome.warnings.len(), 1);
    let warning = &outcome.warnings[0];
    assert_eq!(warning.code, ProblemCode::DefendantMatchedOnPersonalInformation);
    assert_eq!(warning.scope, Scope::Defendant { defendant_id });
    assert_eq!(warning.value("dateOfBirth"), Some("1990-02-03"));
}

#[tokio::test]
async fn test_reference_wins_over_personal_information() {
    let t = common::test_engine();
    accepted(&t, "TVL703").await;

    let outcome = t
        .engine
        .submit_material_v2(v2(
            "TVL703",
            MaterialDefendant {
                prosecutor_reference: Some("REF-1".into()),
                personal_information: Some(ann("Someone")),
            },
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Added);
    assert!(outcome.warnings.is_empty());
}

#[tokio::test]
async fn test_unmatched_defendant_stays_pending() {
    let t = common::test_engine();
    accepted(&t, "TVL704").await;

    let outcome = t
        .engine
        .submit_material_v2(v2(
            "TVL704",
            MaterialDefendant {
                prosecutor_reference: Some("REF-9".into()),
                personal_information: Some(ann("Zoe")),
            },
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Pending);
    assert_eq!(outcome.pending_reason, Some(PendingReason::AwaitingDefendant));
    assert_eq!(t.scheduler.armed_count(), 1);
}

#[tokio::test]
async fn test_ambiguous_personal_information_does_not_match() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL705",
            "C",
            vec![
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
                common::person("REF-2", "Ann", "Smith", "1990-02-03"),
            ],
        ))
        .await
        .unwrap();

    let outcome = t
        .engine
        .submit_material_v2(v2(
            "TVL705",
            MaterialDefendant {
                prosecutor_reference: None,
                personal_information: Some(ann("Ann")),
            },
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Pending);
    assert_eq!(outcome.pending_reason, Some(PendingReason::AwaitingDefendant));
}
