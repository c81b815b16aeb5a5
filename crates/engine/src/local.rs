//! Collaborators for running the engine on one machine: documents on the
//! local filesystem, an in-process case-management ledger and a notifier
//! that only logs.

use async_trait::async_trait;
use shared_types::{AppError, CaseRoster, Defendant, RosterDefendant};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::collaborators::{
    AttachDocumentRequest, CaseManagementSystem, CreateCaseRequest, DocumentStore, Notifier,
    ValidationFailureNotice,
};

/// File handles are paths relative to `root`.
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Only plain relative paths resolve; anything escaping `root` does not.
    fn resolve(&self, file_handle: &str) -> Option<PathBuf> {
        let handle = Path::new(file_handle);
        if handle
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            Some(self.root.join(handle))
        } else {
            None
        }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn exists(&self, file_handle: &str) -> Result<bool, AppError> {
        let Some(path) = self.resolve(file_handle) else {
            tracing::warn!(file_handle, "Document handle outside the store root");
            return Ok(false);
        };
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::unavailable(format!("{}: {}", path.display(), e)))
    }
}

/// Keeps created cases in memory so CPS forms can resolve their rosters.
#[derive(Default)]
pub struct LocalCaseManagement {
    cases: Mutex<HashMap<Uuid, CaseRoster>>,
}

impl LocalCaseManagement {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_cases<T>(
        &self,
        f: impl FnOnce(&mut HashMap<Uuid, CaseRoster>) -> T,
    ) -> Result<T, AppError> {
        let mut cases = self
            .cases
            .lock()
            .map_err(|_| AppError::internal("Case ledger lock poisoned"))?;
        Ok(f(&mut cases))
    }
}

#[async_trait]
impl CaseManagementSystem for LocalCaseManagement {
    async fn create_case(&self, request: &CreateCaseRequest) -> Result<(), AppError> {
        let roster = CaseRoster {
            case_id: request.case_id,
            urn: request.urn.clone(),
            defendants: request.defendants.iter().map(RosterDefendant::from).collect(),
        };
        self.with_cases(|cases| {
            cases.entry(request.case_id).or_insert(roster);
        })?;
        tracing::info!(case_id = %request.case_id, urn = %request.urn, "Case created");
        Ok(())
    }

    async fn add_defendants(
        &self,
        case_id: Uuid,
        defendants: &[Defendant],
    ) -> Result<(), AppError> {
        self.with_cases(|cases| {
            let roster = cases
                .get_mut(&case_id)
                .ok_or_else(|| AppError::not_found(format!("Case {} not found", case_id)))?;
            for defendant in defendants {
                if !roster.defendants.iter().any(|d| d.defendant_id == defendant.id) {
                    roster.defendants.push(RosterDefendant::from(defendant));
                }
            }
            Ok::<(), AppError>(())
        })??;
        tracing::info!(case_id = %case_id, added = defendants.len(), "Defendants added");
        Ok(())
    }

    async fn attach_court_document(&self, request: &AttachDocumentRequest) -> Result<(), AppError> {
        tracing::info!(
            material_id = %request.material_id,
            case_id = %request.case_id,
            defendant_id = %request.defendant_id,
            document_type = %request.document_type,
            "Court document attached"
        );
        Ok(())
    }

    async fn find_case_by_urn(&self, urn: &str) -> Result<Option<CaseRoster>, AppError> {
        self.with_cases(|cases| {
            cases
                .values()
                .find(|c| c.urn.eq_ignore_ascii_case(urn))
                .cloned()
        })
    }
}

/// Used when e-mail notifications are switched off.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_validation_failure(
        &self,
        notice: &ValidationFailureNotice,
    ) -> Result<(), AppError> {
        tracing::info!(
            case_id = %notice.case_id,
            recipient = %notice.recipient,
            problems = notice.problems.len(),
            "Validation failure notice (not sent)"
        );
        Ok(())
    }
}
