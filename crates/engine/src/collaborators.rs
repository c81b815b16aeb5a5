//! Interfaces of the systems the engine talks to but does not own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{AppError, CaseRoster, Defendant, Problem};
use std::sync::Arc;
use uuid::Uuid;

use crate::material::Scheduler;
use crate::reference::ReferenceData;

/// Everything the engine consumes but does not own, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub reference: Arc<dyn ReferenceData>,
    pub documents: Arc<dyn DocumentStore>,
    pub cms: Arc<dyn CaseManagementSystem>,
    pub notifier: Arc<dyn Notifier>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Request to open a case downstream once it has no outstanding problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCaseRequest {
    pub case_id: Uuid,
    pub urn: String,
    pub initiation_code: String,
    pub originating_organisation: String,
    pub defendants: Vec<Defendant>,
}

/// Defendant-level court document forwarded to the case, keyed by material id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachDocumentRequest {
    pub material_id: Uuid,
    pub case_id: Uuid,
    pub defendant_id: Uuid,
    pub document_type: String,
    pub file_handle: String,
    pub file_name: String,
}

/// The downstream case-management system that ultimately hosts a case.
///
/// Calls are expected to be idempotent on their correlation ids (case id,
/// material id) so the engine may retry them.
#[async_trait]
pub trait CaseManagementSystem: Send + Sync {
    async fn create_case(&self, request: &CreateCaseRequest) -> Result<(), AppError>;

    async fn add_defendants(&self, case_id: Uuid, defendants: &[Defendant])
        -> Result<(), AppError>;

    async fn attach_court_document(&self, request: &AttachDocumentRequest) -> Result<(), AppError>;

    /// Defendants of a case the engine never saw, looked up by urn.
    async fn find_case_by_urn(&self, urn: &str) -> Result<Option<CaseRoster>, AppError>;
}

/// Binary document storage. The engine only checks handles exist.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, file_handle: &str) -> Result<bool, AppError>;
}

/// Notice sent to the informant when a submission fails validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailureNotice {
    pub case_id: Uuid,
    pub urn: String,
    pub initiation_code: String,
    pub recipient: String,
    pub problems: Vec<Problem>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_validation_failure(&self, notice: &ValidationFailureNotice)
        -> Result<(), AppError>;
}
