//! Validation-failure notification to the informant.
//!
//! Called fire-and-forget after a submission is partially rejected. Errors are
//! logged but never fail the submission itself.

use shared_types::{CaseRecord, EngineConfig, Problem};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::collaborators::{Notifier, ValidationFailureNotice};
use crate::retry::with_retry;

/// Build the notice for a rejected case, or `None` when no e-mail is due.
///
/// A notice goes out only when notifications are enabled, the initiation
/// code is configured for them and the submission named an informant.
pub fn validation_failure_notice(
    config: &EngineConfig,
    case: &CaseRecord,
    problems: &[Problem],
) -> Option<ValidationFailureNotice> {
    if !config.features.notifications {
        tracing::debug!(case_id = %case.case_id, "Notification skipped, notifications disabled");
        return None;
    }
    let code = &case.details.initiation_code;
    if !config.notifications.initiation_codes.iter().any(|c| c == code) {
        return None;
    }
    let recipient = case.details.informant_email.clone()?;
    Some(ValidationFailureNotice {
        case_id: case.case_id,
        urn: case.urn.clone(),
        initiation_code: code.clone(),
        recipient,
        problems: problems.to_vec(),
    })
}

/// Spawn delivery of a validation-failure e-mail if one is due.
pub fn spawn_validation_failure(
    notifier: Arc<dyn Notifier>,
    config: &EngineConfig,
    case: &CaseRecord,
    problems: &[Problem],
) -> Option<JoinHandle<()>> {
    let notice = validation_failure_notice(config, case, problems)?;
    let retry = config.retry.clone();
    Some(tokio::spawn(async move {
        let result = with_retry(&retry, "send_validation_failure", || {
            let notifier = notifier.clone();
            let notice = notice.clone();
            async move { notifier.send_validation_failure(&notice).await }
        })
        .await;
        match result {
            Ok(()) => {
                tracing::info!(case_id = %notice.case_id, to = %notice.recipient, "Validation failure e-mail sent");
            }
            Err(e) => {
                tracing::error!(error = %e, case_id = %notice.case_id, to = %notice.recipient, "Validation failure e-mail failed");
            }
        }
    }))
}
