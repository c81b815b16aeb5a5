use serde_json::json;
use shared_types::{
    CaseStatus, CorrectionRequest, CorrectionTarget, DefendantCorrection, MaterialStatus,
    OffenceCorrection, ProblemCode,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redeliveries_open_the_case_once() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    let raw = common::clean_prosecution(case_id, "TVL950");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = t.engine.clone();
            let raw = raw.clone();
            tokio::spawn(async move { engine.submit_prosecution(raw).await })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert!(outcomes.iter().all(|o| o.status == CaseStatus::Accepted));
    assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);
    assert_eq!(t.cms.created_count(), 1);
    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.processed_submissions.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_new_submissions_leave_one_winner() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = t.engine.clone();
            let raw = common::clean_prosecution(case_id, "TVL951");
            tokio::spawn(async move { engine.submit_prosecution(raw).await })
        })
        .collect();
    let mut duplicates = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.status, CaseStatus::Accepted);
        if outcome
            .problems
            .iter()
            .any(|p| p.code == ProblemCode::DuplicatedProsecution)
        {
            duplicates += 1;
        }
    }
    assert_eq!(duplicates, 3);
    assert_eq!(t.cms.created_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_corrections_converge() {
    let t = common::test_engine();
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL952",
            "C",
            vec![json!({
                "prosecutor_reference": "REF-1",
                "person": {"forename": "Ann", "surname": "Smith", "date_of_birth": "1990-02-03", "nationality": "XXX"},
                "offences": [common::offence("NOPE001")]
            })],
        ))
        .await
        .unwrap();
    let defendant_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    let nationality = CorrectionRequest {
        submission_id: Uuid::new_v4(),
        case_id,
        target: CorrectionTarget::Defendant {
            defendant_id,
            correction: DefendantCorrection {
                nationality: Some("GBR".into()),
                ..Default::default()
            },
        },
    };
    let offence = CorrectionRequest {
        submission_id: Uuid::new_v4(),
        case_id,
        target: CorrectionTarget::Defendant {
            defendant_id,
            correction: DefendantCorrection {
                offences: vec![OffenceCorrection {
                    sequence: 1,
                    offence_code: Some("TH68001".into()),
                    ..Default::default()
                }],
                ..Default::default()
            },
        },
    };

    let a = {
        let engine = t.engine.clone();
        tokio::spawn(async move { engine.submit_correction(nationality).await })
    };
    let b = {
        let engine = t.engine.clone();
        tokio::spawn(async move { engine.submit_correction(offence).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let case = t.engine.get_case(case_id).unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Accepted);
    assert!(case.problems.is_empty());
    assert_eq!(case.processed_submissions.len(), 3);
    assert_eq!(t.cms.created_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_expiry_racing_reconciliation_settles_once() {
    let t = common::test_engine();
    let request = common::material("TVL953", None, "CASE_FILE");
    let material_id = request.material_id;
    t.engine.submit_material(request).await.unwrap();
    let fired = t.scheduler.fire(material_id).unwrap();

    let expiry = {
        let engine = t.engine.clone();
        tokio::spawn(async move { engine.on_timer_fired(fired) })
    };
    let submission = {
        let engine = t.engine.clone();
        tokio::spawn(async move {
            engine
                .submit_prosecution(common::clean_prosecution(Uuid::new_v4(), "TVL953"))
                .await
        })
    };
    expiry.await.unwrap().unwrap();
    submission.await.unwrap().unwrap();

    let material = t.engine.get_material(material_id).unwrap().unwrap();
    assert_ne!(material.status, MaterialStatus::Pending);
    let settled = t.sink.named("public.material.added").len()
        + t.sink.named("public.material.rejected").len();
    assert_eq!(settled, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_material_stored_after_acceptance_is_still_added() {
    let (reference, gate) = common::gated_reference();
    let t = common::test_engine_with(common::test_config(), Arc::new(reference));
    let case_id = Uuid::new_v4();
    t.engine
        .submit_prosecution(common::prosecution(
            case_id,
            "TVL954",
            "C",
            vec![json!({
                "prosecutor_reference": "REF-1",
                "person": {"forename": "Ann", "surname": "Smith", "date_of_birth": "1990-02-03", "nationality": "XXX"},
                "offences": [common::offence("TH68001")]
            })],
        ))
        .await
        .unwrap();
    let defendant_id = t.engine.get_case(case_id).unwrap().unwrap().defendants[0].id;

    let request = common::material("TVL954", None, "CASE_FILE");
    let material_id = request.material_id;
    let submission = {
        let engine = t.engine.clone();
        tokio::spawn(async move { engine.submit_material(request).await })
    };
    let entered = gate.entered;
    tokio::task::spawn_blocking(move || entered.recv())
        .await
        .unwrap()
        .unwrap();

    // Accepted while the material is classified against the rejected case.
    let corrected = t
        .engine
        .submit_correction(CorrectionRequest {
            submission_id: Uuid::new_v4(),
            case_id,
            target: CorrectionTarget::Defendant {
                defendant_id,
                correction: DefendantCorrection {
                    nationality: Some("GBR".into()),
                    ..Default::default()
                },
            },
        })
        .await
        .unwrap();
    assert_eq!(corrected.status, CaseStatus::Accepted);
    gate.release.send(()).unwrap();

    let outcome = submission.await.unwrap().unwrap();
    assert_eq!(outcome.status, MaterialStatus::Added);
    let material = t.engine.get_material(material_id).unwrap().unwrap();
    assert_eq!(material.status, MaterialStatus::Added);
    assert_eq!(material.case_id, Some(case_id));
    assert_eq!(t.scheduler.armed_count(), 0);
    assert_eq!(t.sink.named("public.material.added").len(), 1);
    assert!(t.sink.named("public.material.rejected").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_idpc_bundles_add_one() {
    let t = common::test_engine();
    t.engine
        .submit_prosecution(common::clean_prosecution(Uuid::new_v4(), "TVL955"))
        .await
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = t.engine.clone();
            tokio::spawn(async move {
                engine
                    .submit_idpc_material(common::idpc("TVL955", "REF-1"))
                    .await
            })
        })
        .collect();
    let mut added = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if outcome.status == MaterialStatus::Added {
            added += 1;
        } else {
            assert_eq!(outcome.status, MaterialStatus::Rejected);
        }
    }
    assert_eq!(added, 1);
    assert_eq!(t.sink.named("public.idpc.material.matched").len(), 1);
    assert_eq!(t.sink.named("public.idpc.material.already-exists").len(), 5);
    assert_eq!(t.cms.attached_count(), 1);
}
