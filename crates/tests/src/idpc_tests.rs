use shared_types::{AttachmentStatus, MaterialStatus, PendingReason, Visibility};
use uuid::Uuid;

use crate::common;

async fn accepted(t: &common::TestEngine, urn: &str) -> Uuid {
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::clean_prosecution(case_id, urn))
        .await
        .unwrap();
    t.sink.clear();
    case_id
}

#[tokio::test]
async fn test_idpc_matches_defendant_and_attaches() {
    let t = common::test_engine();
    let case_id = accepted(&t, "TVL800").await;
    let defendant_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    let request = common::idpc("TVL800", " REF-1 ");
    let material_id = request.material_id;
    let outcome = t.engine.submit_idpc_material(request).await.unwrap();
    assert_eq!(outcome.status, MaterialStatus::Added);

    assert_eq!(
        t.sink.names(),
        vec![
            "idpc.material.received",
            "idpc.material.matched",
            "public.idpc.material.matched",
        ]
    );
    let events = t.sink.events();
    assert_eq!(events[0].visibility, Visibility::Internal);
    assert!(events.iter().all(|e| e.correlation_id == material_id));
    assert_eq!(events[1].defendant_id, Some(defendant_id));

    let material = t.engine.get_material(material_id).unwrap().unwrap();
    assert_eq!(material.document_type, "IDPC");
    assert_eq!(material.attachment, AttachmentStatus::Attached);
    assert_eq!(t.cms.attached_count(), 1);
}

#[tokio::test]
async fn test_second_idpc_for_defendant_already_exists() {
    let t = common::test_engine();
    accepted(&t, "TVL801").await;

    t.engine
        .submit_idpc_material(common::idpc("TVL801", "REF-1"))
        .await
        .unwrap();
    let second = t
        .engine
        .submit_idpc_material(common::idpc("TVL801", "REF-1"))
        .await
        .unwrap();

    assert_eq!(second.status, MaterialStatus::Rejected);
    assert_eq!(
        t.sink.named("public.idpc.material.already-exists").len(),
        1
    );
    assert_eq!(t.cms.attached_count(), 1);
}

#[tokio::test]
async fn test_idpc_before_case_is_match_pending() {
    let t = common::test_engine();
    let request = common::idpc("TVL802", "REF-1");
    let material_id = request.material_id;

    let outcome = t.engine.submit_idpc_material(request).await.unwrap();
    assert_eq!(outcome.status, MaterialStatus::Pending);
    assert_eq!(outcome.pending_reason, Some(PendingReason::AwaitingCase));
    assert_eq!(
        t.sink.names(),
        vec![
            "idpc.material.received",
            "idpc.material.match-pending",
            "public.idpc.material.match-pending",
        ]
    );
    assert!(t.sink.named("public.idpc.material.received").is_empty());

    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::clean_prosecution(case_id, "TVL802"))
        .await
        .unwrap();
    let material = t.engine.get_material(material_id).unwrap().unwrap();
    assert_eq!(material.status, MaterialStatus::Added);
    assert_eq!(material.case_id, Some(case_id));
    assert_eq!(t.sink.named("public.idpc.material.matched").len(), 1);
}

#[tokio::test]
async fn test_idpc_for_unknown_defendant_waits() {
    let t = common::test_engine();
    accepted(&t, "TVL803").await;
    let outcome = t
        .engine
        .submit_idpc_material(common::idpc("TVL803", "REF-7"))
        .await
        .unwrap();
    assert_eq!(outcome.status, MaterialStatus::Pending);
    assert_eq!(outcome.pending_reason, Some(PendingReason::AwaitingDefendant));
    assert_eq!(t.scheduler.armed_count(), 1);
}
