use serde_json::json;
use shared_types::{
    AppErrorKind, CaseStatus, CorrectionRequest, CorrectionTarget, DefendantCorrection,
    DownstreamStatus, ProblemCode, SummonsDecision,
};
use uuid::Uuid;

use crate::common::{self, TestEngine};

async fn parked_case(t: &TestEngine, urn: &str) -> Uuid {
    let case_id = Uuid::new_v4();
    let outcome = t
        .engine
        .submit_prosecution(common::prosecution(
            case_id,
            urn,
            "S",
            vec![
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
                common::person("REF-2", "Bob", "Jones", "1985-06-01"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::ParkedForApproval);
    case_id
}

fn decision(case_id: Uuid, defendant_ids: Vec<Uuid>) -> SummonsDecision {
    SummonsDecision {
        submission_id: Uuid::new_v4(),
        case_id,
        defendant_ids,
    }
}

#[tokio::test]
async fn test_clean_summons_case_is_parked() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL500").await;

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(case.defendants.is_empty());
    assert_eq!(case.parked_defendants.len(), 2);
    assert_eq!(case.downstream, DownstreamStatus::NotRequested);
    assert_eq!(t.cms.created_count(), 0);

    let parked = t.sink.named("public.defendants.parked-for-approval");
    assert_eq!(parked.len(), 1);
    assert_eq!(parked[0].payload["parkedDefendantIds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_approving_all_creates_the_case() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL501").await;

    let outcome = t
        .engine
        .approve_summons(decision(case_id, vec![]))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::Accepted);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants.len(), 2);
    assert!(case.parked_defendants.is_empty());
    assert_eq!(case.downstream, DownstreamStatus::Created);
    assert_eq!(t.cms.created_count(), 1);
    assert_eq!(t.sink.named("public.defendants.summons-approved").len(), 1);
}

#[tokio::test]
async fn test_partial_approvals_add_defendants_downstream() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL502").await;
    let parked = t.engine.get_case(case_id).unwrap().unwrap().parked_defendants;
    let (first, second) = (parked[0].id, parked[1].id);

    t.engine
        .approve_summons(decision(case_id, vec![first]))
        .await
        .unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants.len(), 1);
    assert_eq!(case.parked_defendants.len(), 1);
    assert_eq!(t.cms.created_count(), 1);

    t.engine
        .approve_summons(decision(case_id, vec![second]))
        .await
        .unwrap();
    assert_eq!(t.cms.created_count(), 1);
    let added = t.cms.added.lock().unwrap().clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].0, case_id);
    assert_eq!(added[0].1[0].id, second);
}

#[tokio::test]
async fn test_rejecting_summons_drops_parked_defendants() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL503").await;

    let outcome = t
        .engine
        .reject_summons(decision(case_id, vec![]))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::ParkedForApproval);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(case.parked_defendants.is_empty());
    assert!(case.defendants.is_empty());
    assert_eq!(t.cms.created_count(), 0);
    assert_eq!(t.sink.named("public.defendants.summons-rejected").len(), 1);

    let err = t
        .engine
        .approve_summons(decision(case_id, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
}

#[tokio::test]
async fn test_decisions_on_unknown_defendants_are_not_found() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL504").await;

    let err = t
        .engine
        .approve_summons(decision(case_id, vec![Uuid::new_v4()]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
    assert_eq!(
        t.engine
            .get_case(case_id)
            .unwrap()
            .unwrap()
            .parked_defendants
            .len(),
        2
    );

    let err = t
        .engine
        .reject_summons(decision(Uuid::new_v4(), vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
}

#[tokio::test]
async fn test_approval_redelivery_replays() {
    let t = common::test_engine();
    let case_id = parked_case(&t, "TVL505").await;
    let approval = decision(case_id, vec![]);

    let first = t.engine.approve_summons(approval.clone()).await.unwrap();
    let again = t.engine.approve_summons(approval).await.unwrap();
    assert!(again.replayed);
    assert_eq!(again.version, first.version);
    assert_eq!(t.cms.created_count(), 1);
}

#[tokio::test]
async fn test_summons_case_with_problems_is_not_parked() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let outcome = t
        .engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL506",
            "S",
            vec![json!({
                "prosecutor_reference": "REF-1",
                "person": {"forename": "Ann", "surname": "Smith", "date_of_birth": "1990-02-03"},
                "offences": [common::offence("NOPE001")]
            })],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::PartiallyRejected);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(case.parked_defendants.is_empty());
    assert!(t.sink.named("defendants.parked-for-approval").is_empty());
}

#[tokio::test]
async fn test_approval_waits_for_open_problems() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL507",
            "S",
            vec![common::person("REF-1", "Ann", "Smith", "1990-02-03")],
        ))
        .await
        .unwrap();

    let resubmitted = t
        .engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL507",
            "S",
            vec![json!({
                "prosecutor_reference": "REF-2",
                "person": {"forename": "Bob", "surname": "Jones", "date_of_birth": "1985-06-01", "nationality": "XXX"},
                "offences": [common::offence("TH68001")]
            })],
        ))
        .await
        .unwrap();
    assert_eq!(resubmitted.status, CaseStatus::PartiallyRejected);
    assert_eq!(resubmitted.problems[0].code, ProblemCode::DefendantNationalityInvalid);

    let err = t
        .engine
        .approve_summons(decision(case_id, vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::PartiallyRejected);
    assert_eq!(case.parked_defendants.len(), 1);
    assert_eq!(t.cms.created_count(), 0);
    assert!(t.sink.named("defendants.summons-approved").is_empty());

    let bob = case.defendant_by_reference("REF-2").unwrap().id;
    let corrected = t
        .engine
        .submit_correction(CorrectionRequest {
            submission_id: Uuid::new_v4(),
            case_id,
            target: CorrectionTarget::Defendant {
                defendant_id: bob,
                correction: DefendantCorrection {
                    nationality: Some("GBR".into()),
                    ..Default::default()
                },
            },
        })
        .await
        .unwrap();
    assert_eq!(corrected.status, CaseStatus::ParkedForApproval);

    let approved = t
        .engine
        .approve_summons(decision(case_id, vec![]))
        .await
        .unwrap();
    assert_eq!(approved.status, CaseStatus::Accepted);
    assert_eq!(t.engine.get_case(case_id).unwrap().unwrap().defendants.len(), 2);
    assert_eq!(t.cms.created_count(), 1);
}
