use engine::normalizer::derive_defendant_id;
use serde_json::json;
use shared_types::{CaseStatus, ProblemCode, SubmitProsecutionRequest};
use uuid::Uuid;

use crate::common;

#[tokio::test]
async fn test_redelivered_submission_replays_recorded_outcome() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let raw = common::clean_prosecution(case_id, "TVL400");

    let first = t.engine.submit_prosecution(raw.clone()).await.unwrap();
    let first_events = t.sink.events();
    t.sink.clear();

    let again = t.engine.submit_prosecution(raw).await.unwrap();
    assert!(again.replayed);
    assert_eq!(again.status, first.status);
    assert_eq!(t.cms.created_count(), 1);

    let replayed = t.sink.events();
    assert_eq!(replayed.len(), first_events.len());
    for (a, b) in replayed.iter().zip(first_events.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.name, b.name);
    }
}

#[tokio::test]
async fn test_new_submission_for_accepted_case_is_a_duplicate() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let first = t
        .engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL401"))
        .await
        .unwrap();
    t.sink.clear();

    let second = common::clean_prosecution(case_id, "TVL401");
    let submission_id = second.submission_id;
    let outcome = t.engine.submit_prosecution(second).await.unwrap();

    assert_eq!(outcome.status, CaseStatus::Accepted);
    assert_eq!(outcome.version, first.version);
    assert_eq!(outcome.problems.len(), 1);
    assert_eq!(outcome.problems[0].code, ProblemCode::DuplicatedProsecution);
    assert_eq!(outcome.problems[0].value("urn"), Some("TVL401"));
    assert_eq!(
        t.sink.names(),
        vec!["prosecution.rejected", "public.prosecution.rejected"]
    );
    assert!(t
        .sink
        .events()
        .iter()
        .all(|e| e.correlation_id == submission_id));

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(!case.processed_submissions.contains_key(&submission_id));
    assert_eq!(t.cms.created_count(), 1);
}

#[tokio::test]
async fn test_defendant_ids_are_deterministic() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL402",
            "C",
            vec![
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
                common::person("REF-2", "Bob", "Jones", "1985-06-01"),
            ],
        ))
        .await
        .unwrap();

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(
        case.defendants[0].id,
        derive_defendant_id(case_id, Some("REF-1"), 0)
    );
    assert_eq!(
        case.defendants[1].id,
        derive_defendant_id(case_id, Some("REF-2"), 1)
    );
}

#[tokio::test]
async fn test_channel_supplied_defendant_id_is_kept() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let defendant_id = Uuid::new_v4();
    let mut defendant = common::person("REF-1", "Ann", "Smith", "1990-02-03");
    defendant["id"] = json!(defendant_id);
    t.engine
        .submit_prosecution(common::prosecution(case_id, "TVL403", "C", vec![defendant]))
        .await
        .unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants[0].id, defendant_id);
}

fn batch(case_id: Uuid, defendants: Vec<serde_json::Value>) -> SubmitProsecutionRequest {
    SubmitProsecutionRequest::from_json(common::prosecution_json(
        case_id, "TVL404", "batch_feed", "C", defendants,
    ))
    .unwrap()
}

#[tokio::test]
async fn test_batch_resubmission_merges_by_reference() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();

    let mut bad = common::person("REF-1", "Ann", "Smith", "1990-02-03");
    bad["offences"] = json!([common::offence("NOPE001")]);
    let first = t
        .engine
        .submit_prosecution(batch(
            case_id,
            vec![bad, common::person("REF-2", "Bob", "Jones", "1985-06-01")],
        ))
        .await
        .unwrap();
    assert_eq!(first.status, CaseStatus::PartiallyRejected);
    let held_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    // REF-1 now arrives second, so its derived id differs from the held one.
    let second = t
        .engine
        .submit_prosecution(batch(
            case_id,
            vec![
                common::person("REF-2", "Bob", "Jones", "1985-06-01"),
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(second.status, CaseStatus::Accepted);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants.len(), 2);
    let ann = case.defendant_by_reference("REF-1").unwrap();
    assert_eq!(ann.id, held_id);
    assert_eq!(ann.offences[0].code, "TH68001");
}

#[tokio::test]
async fn test_repeated_reference_in_one_batch_resubmission_is_merged() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();

    let mut bad = common::person("REF-1", "Ann", "Smith", "1990-02-03");
    bad["offences"] = json!([common::offence("NOPE001")]);
    t.engine
        .submit_prosecution(batch(case_id, vec![bad]))
        .await
        .unwrap();

    let mut extra = common::person("REF-1", "Ann", "Smith", "1990-02-03");
    extra["offences"] = json!([common::offence("RT88191")]);
    let outcome = t
        .engine
        .submit_prosecution(batch(
            case_id,
            vec![common::person("REF-1", "Ann", "Smith", "1990-02-03"), extra],
        ))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::Accepted);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants.len(), 1);
    let codes: Vec<&str> = case.defendants[0]
        .offences
        .iter()
        .map(|o| o.code.as_str())
        .collect();
    assert_eq!(codes, vec!["TH68001", "RT88191"]);
    assert_eq!(case.defendants[0].offences[1].sequence, 2);
}

#[tokio::test]
async fn test_first_time_batch_keeps_repeated_references_apart() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(batch(
            case_id,
            vec![
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
                common::person("REF-1", "Ann", "Smith", "1990-02-03"),
            ],
        ))
        .await
        .unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.defendants.len(), 2);
}
