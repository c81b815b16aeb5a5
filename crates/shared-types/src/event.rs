use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Internal event names. The public counterpart of each is `public.` + name.
pub mod names {
    pub const PROSECUTION_RECEIVED: &str = "prosecution.received";
    pub const PROSECUTION_RECEIVED_WITH_WARNINGS: &str = "prosecution.received-with-warnings";
    pub const PROSECUTION_REJECTED: &str = "prosecution.rejected";
    pub const CASE_VALIDATION_FAILED: &str = "case.validation-failed";
    pub const DEFENDANT_VALIDATION_FAILED: &str = "defendant.validation-failed";
    pub const DEFENDANTS_PARKED: &str = "defendants.parked-for-approval";
    pub const SUMMONS_APPROVED: &str = "defendants.summons-approved";
    pub const SUMMONS_REJECTED: &str = "defendants.summons-rejected";
    pub const CASE_EJECTED: &str = "case.ejected";
    pub const MATERIAL_PENDING: &str = "material.pending";
    pub const MATERIAL_ADDED: &str = "material.added";
    pub const MATERIAL_REJECTED: &str = "material.rejected";
    pub const IDPC_RECEIVED: &str = "idpc.material.received";
    pub const IDPC_MATCHED: &str = "idpc.material.matched";
    pub const IDPC_MATCH_PENDING: &str = "idpc.material.match-pending";
    pub const IDPC_ALREADY_EXISTS: &str = "idpc.material.already-exists";
    pub const CPS_MATERIAL_STATUS_UPDATED: &str = "cps-serve.material-status-updated";
}

pub const PUBLIC_PREFIX: &str = "public.";

/// Public name for an internal event name.
pub fn public_name(internal: &str) -> String {
    format!("{}{}", PUBLIC_PREFIX, internal)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Consumed only inside the engine's own bounded context.
    Internal,
    /// Visible to downstream consumers.
    Public,
}

/// One published event. Internal and public events of the same outcome share
/// `correlation_id` so consumers can join them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defendant_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Name without the `public.` prefix.
    pub fn base_name(&self) -> &str {
        self.name.strip_prefix(PUBLIC_PREFIX).unwrap_or(&self.name)
    }
}
