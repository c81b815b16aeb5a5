use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::EventEnvelope;
use crate::problem::Problem;

#[cfg(feature = "validation")]
use validator::Validate;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Expiry class of a pending material. Durations come from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerClass {
    #[default]
    Standard,
    BulkScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    Pending,
    Added,
    Rejected,
}

impl MaterialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Pending => "pending",
            MaterialStatus::Added => "added",
            MaterialStatus::Rejected => "rejected",
        }
    }
}

/// Why a material is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    AwaitingCase,
    AwaitingDefendant,
}

/// Downstream attach request for defendant-level court documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttachmentStatus {
    NotRequired,
    Requested,
    Attached,
    Failed { reason: String },
}

/// Intake route a material came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Standard,
    /// Defendant located by reference and/or personal information, with warnings.
    V2,
    /// Initial details of the prosecution case bundle.
    Idpc,
}

/// Handle returned by the scheduler for a single armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A companion document submitted for a case (and optionally a defendant).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct SubmitMaterialRequest {
    pub material_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case URN is required"))
    )]
    pub urn: String,
    #[serde(default)]
    pub prosecutor_defendant_reference: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Document type is required"))
    )]
    pub document_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File name is required"))
    )]
    pub file_name: String,
    pub mime_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File store handle is required"))
    )]
    pub file_handle: String,
    #[serde(default)]
    pub timer_class: TimerClass,
}

/// Name and date of birth offered to locate a defendant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInformation {
    pub forename: String,
    pub surname: String,
    pub date_of_birth: NaiveDate,
}

/// How a material identifies its defendant. Both parts are optional on the
/// wire; the manager decides which combinations are acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialDefendant {
    #[serde(default)]
    pub prosecutor_reference: Option<String>,
    #[serde(default)]
    pub personal_information: Option<PersonalInformation>,
}

impl MaterialDefendant {
    pub fn by_reference(reference: impl Into<String>) -> Self {
        Self {
            prosecutor_reference: Some(reference.into()),
            personal_information: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prosecutor_reference.is_none() && self.personal_information.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct SubmitMaterialV2Request {
    pub material_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case URN is required"))
    )]
    pub urn: String,
    #[serde(default)]
    pub defendant: MaterialDefendant,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Document type is required"))
    )]
    pub document_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File name is required"))
    )]
    pub file_name: String,
    pub mime_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File store handle is required"))
    )]
    pub file_handle: String,
    #[serde(default)]
    pub timer_class: TimerClass,
}

/// IDPC bundle for one defendant. Always defendant-level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct SubmitIdpcRequest {
    pub material_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case URN is required"))
    )]
    pub urn: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Prosecutor defendant reference is required"))
    )]
    pub prosecutor_defendant_reference: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File name is required"))
    )]
    pub file_name: String,
    pub mime_type: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "File store handle is required"))
    )]
    pub file_handle: String,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Lifecycle state of one material. Exits from `Pending` happen exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub material_id: Uuid,
    pub kind: MaterialKind,
    pub urn: String,
    pub case_id: Option<Uuid>,
    pub defendant: MaterialDefendant,
    pub defendant_id: Option<Uuid>,
    pub document_type: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_handle: String,
    pub timer_class: TimerClass,
    pub status: MaterialStatus,
    pub pending_reason: Option<PendingReason>,
    pub problems: Vec<Problem>,
    pub warnings: Vec<Problem>,
    pub timer: Option<TimerHandle>,
    pub attachment: AttachmentStatus,
    /// Everything published for this material, replayed on redelivery.
    pub events: Vec<EventEnvelope>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl MaterialRecord {
    pub fn is_pending(&self) -> bool {
        self.status == MaterialStatus::Pending
    }

    /// Defendant-level when the submitter named a defendant in any way.
    pub fn is_defendant_level(&self) -> bool {
        !self.defendant.is_empty()
    }
}

/// Result returned to the submitter of a material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOutcome {
    pub material_id: Uuid,
    pub status: MaterialStatus,
    pub pending_reason: Option<PendingReason>,
    pub problems: Vec<Problem>,
    pub warnings: Vec<Problem>,
    pub replayed: bool,
}

impl MaterialOutcome {
    pub fn from_record(record: &MaterialRecord, replayed: bool) -> Self {
        Self {
            material_id: record.material_id,
            status: record.status,
            pending_reason: record.pending_reason,
            problems: record.problems.clone(),
            warnings: record.warnings.clone(),
            replayed,
        }
    }
}
