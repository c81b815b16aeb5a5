use serde_json::json;
use shared_types::{
    AppErrorKind, CaseStatus, DownstreamStatus, EngineConfig, ProblemCode, SessionState,
    Visibility,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::common;

#[tokio::test]
async fn test_clean_case_is_accepted_and_created_downstream() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let raw = common::clean_prosecution(case_id, "tvl200");
    let submission_id = raw.submission_id;

    let outcome = t.engine.submit_prosecution(raw).await.unwrap();
    assert_eq!(outcome.status, CaseStatus::Accepted);
    assert!(outcome.problems.is_empty());
    assert!(!outcome.replayed);

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.urn, "TVL200");
    assert_eq!(case.downstream, DownstreamStatus::Created);
    assert_eq!(t.cms.created_count(), 1);
    let created = t.cms.created.lock().unwrap()[0].clone();
    assert_eq!(created.case_id, case_id);
    assert_eq!(created.defendants.len(), 1);

    assert_eq!(
        t.sink.names(),
        vec!["prosecution.received", "public.prosecution.received"]
    );
    let events = t.sink.events();
    assert_eq!(events[0].visibility, Visibility::Internal);
    assert_eq!(events[1].visibility, Visibility::Public);
    assert!(events.iter().all(|e| e.correlation_id == submission_id));
    assert_eq!(
        events[1].payload["defendantIds"][0],
        json!(case.defendants[0].id)
    );
}

#[tokio::test]
async fn test_downstream_failure_keeps_case_accepted_until_retried() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.cms.fail_create.store(true, Ordering::SeqCst);

    let outcome = t
        .engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL201"))
        .await
        .unwrap();
    assert_eq!(outcome.status, CaseStatus::Accepted);
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(matches!(case.downstream, DownstreamStatus::Failed { .. }));

    t.cms.fail_create.store(false, Ordering::SeqCst);
    t.engine.retry_downstream(case_id).await.unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.downstream, DownstreamStatus::Created);
    assert_eq!(t.cms.created_count(), 1);

    let err = t.engine.retry_downstream(case_id).await.unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
}

#[tokio::test]
async fn test_partially_rejected_case_is_not_created_downstream() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let outcome = t
        .engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL202",
            "C",
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
    assert_eq!(case.downstream, DownstreamStatus::NotRequested);
    assert_eq!(t.cms.created_count(), 0);

    let err = t.engine.retry_downstream(case_id).await.unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
}

#[tokio::test]
async fn test_eject_is_terminal_and_idempotent() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL203"))
        .await
        .unwrap();
    t.sink.clear();

    let outcome = t.engine.eject_case(case_id).unwrap();
    assert_eq!(outcome.status, CaseStatus::Ejected);
    assert_eq!(t.sink.names(), vec!["case.ejected", "public.case.ejected"]);
    assert!(t
        .sink
        .events()
        .iter()
        .all(|e| e.correlation_id == case_id));

    let again = t.engine.eject_case(case_id).unwrap();
    assert_eq!(again.status, CaseStatus::Ejected);
    assert_eq!(again.version, outcome.version);
    assert_eq!(t.sink.events().len(), 2);

    let err = t
        .engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL203"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);

    let err = t.engine.begin_session(case_id).unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);
}

#[tokio::test]
async fn test_unknown_case_operations_are_not_found() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    assert!(t.engine.get_case(case_id).unwrap().is_none());
    assert_eq!(
        t.engine.eject_case(case_id).unwrap_err().kind,
        AppErrorKind::NotFound
    );
    assert_eq!(
        t.engine.begin_session(case_id).unwrap_err().kind,
        AppErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_session_is_exclusive() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL204"))
        .await
        .unwrap();

    t.engine.begin_session(case_id).unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert!(matches!(case.session, SessionState::Exclusive { .. }));
    assert!(!case.accepts_material());

    let err = t.engine.begin_session(case_id).unwrap_err();
    assert_eq!(err.kind, AppErrorKind::Conflict);

    t.engine.end_session(case_id).await.unwrap();
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.session, SessionState::Open);

    let version = case.version;
    t.engine.end_session(case_id).await.unwrap();
    assert_eq!(t.engine.get_case(case_id).unwrap().unwrap().version, version);
}

#[tokio::test]
async fn test_validation_failure_notifies_informant() {
    let mut config = common::test_config();
    config.features.notifications = true;
    let t = common::test_engine_with(config, Arc::new(common::reference_data()));

    t.engine
        .submit_prosecution(common::prosecution(
            Uuid::new_v4(),
            "TVL205",
            "S",
            vec![json!({
                "prosecutor_reference": "REF-1",
                "person": {"forename": "Ann", "surname": "Smith", "date_of_birth": "1990-02-03", "nationality": "XXX"},
                "offences": [common::offence("TH68001")]
            })],
        ))
        .await
        .unwrap();

    let notifier = t.notifier.clone();
    assert!(common::wait_for(|| notifier.sent_count() == 1).await);
    let notice = t.notifier.sent.lock().unwrap()[0].clone();
    assert_eq!(notice.recipient, "officer@police.example");
    assert_eq!(notice.urn, "TVL205");
    assert_eq!(notice.problems[0].code, ProblemCode::DefendantNationalityInvalid);
}

#[tokio::test]
async fn test_no_notification_outside_configured_codes() {
    let mut config = EngineConfig::default();
    config.features.notifications = true;
    let t = common::test_engine_with(config, Arc::new(common::reference_data()));

    t.engine
        .submit_prosecution(common::prosecution(
            Uuid::new_v4(),
            "TVL206",
            "C",
            vec![json!({
                "prosecutor_reference": "REF-1",
                "person": {"forename": "Ann", "surname": "Smith", "date_of_birth": "1990-02-03", "nationality": "XXX"},
                "offences": [common::offence("TH68001")]
            })],
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(t.notifier.sent_count(), 0);
}

#[tokio::test]
async fn test_timer_pump_feeds_expiry_back_into_engine() {
    let t = common::test_engine();
    let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
    let pump = t.engine.spawn_timer_pump(receiver);

    let request = common::material("TVL207", None, "CASE_FILE");
    let material_id = request.material_id;
    t.engine.submit_material(request).await.unwrap();
    let fired = t.scheduler.fire(material_id).unwrap();
    sender.send(fired).unwrap();

    let engine = t.engine.clone();
    assert!(
        common::wait_for(|| {
            engine
                .get_material(material_id)
                .unwrap()
                .is_some_and(|m| !m.is_pending())
        })
        .await
    );
    drop(sender);
    pump.await.unwrap();
}
