//! Outcome publisher.
//!
//! Every state transition is described by an [`Outcome`]. Each outcome maps
//! to exactly one internal event and, for outcomes consumers may see, one
//! public event named `public.` + the internal name. Both share the
//! correlation id, case id and defendant scope.

use chrono::{DateTime, Utc};
use serde_json::json;
use shared_types::{
    names, public_name, CpsFormType, EventEnvelope, MatchedDefendant, PendingReason, Problem,
    SubmissionStatus, Visibility,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

// ── Outcomes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ProsecutionReceived {
        case_id: Uuid,
        urn: String,
        defendant_ids: Vec<Uuid>,
    },
    ProsecutionReceivedWithWarnings {
        case_id: Uuid,
        urn: String,
        defendant_ids: Vec<Uuid>,
        warnings: Vec<Problem>,
    },
    ProsecutionRejected {
        case_id: Uuid,
        urn: String,
        problems: Vec<Problem>,
    },
    CaseValidationFailed {
        case_id: Uuid,
        urn: String,
        problems: Vec<Problem>,
    },
    DefendantValidationFailed {
        case_id: Uuid,
        defendant_id: Uuid,
        problems: Vec<Problem>,
    },
    DefendantsParked {
        case_id: Uuid,
        urn: String,
        defendant_ids: Vec<Uuid>,
    },
    SummonsApproved {
        case_id: Uuid,
        defendant_ids: Vec<Uuid>,
    },
    SummonsRejected {
        case_id: Uuid,
        defendant_ids: Vec<Uuid>,
    },
    CaseEjected {
        case_id: Uuid,
        urn: String,
    },
    MaterialPending {
        material_id: Uuid,
        case_id: Option<Uuid>,
        reason: PendingReason,
        warnings: Vec<Problem>,
    },
    MaterialAdded {
        material_id: Uuid,
        case_id: Uuid,
        defendant_id: Option<Uuid>,
        document_type: String,
        warnings: Vec<Problem>,
    },
    MaterialRejected {
        material_id: Uuid,
        case_id: Option<Uuid>,
        problems: Vec<Problem>,
    },
    IdpcReceived {
        material_id: Uuid,
        urn: String,
    },
    IdpcMatched {
        material_id: Uuid,
        case_id: Uuid,
        defendant_id: Uuid,
    },
    IdpcMatchPending {
        material_id: Uuid,
        urn: String,
        reason: PendingReason,
    },
    IdpcAlreadyExists {
        material_id: Uuid,
        case_id: Uuid,
        defendant_id: Uuid,
    },
    CpsFormReceived {
        form_type: CpsFormType,
        urn: String,
    },
    CpsFormSubmitted {
        form_type: CpsFormType,
        case_id: Uuid,
        matched: Vec<MatchedDefendant>,
        form_data: serde_json::Value,
    },
    CpsMaterialStatusUpdated {
        case_id: Option<Uuid>,
        status: SubmissionStatus,
        errors: Vec<Problem>,
    },
}

impl Outcome {
    /// Internal event name.
    pub fn name(&self) -> String {
        match self {
            Outcome::ProsecutionReceived { .. } => names::PROSECUTION_RECEIVED.into(),
            Outcome::ProsecutionReceivedWithWarnings { .. } => {
                names::PROSECUTION_RECEIVED_WITH_WARNINGS.into()
            }
            Outcome::ProsecutionRejected { .. } => names::PROSECUTION_REJECTED.into(),
            Outcome::CaseValidationFailed { .. } => names::CASE_VALIDATION_FAILED.into(),
            Outcome::DefendantValidationFailed { .. } => names::DEFENDANT_VALIDATION_FAILED.into(),
            Outcome::DefendantsParked { .. } => names::DEFENDANTS_PARKED.into(),
            Outcome::SummonsApproved { .. } => names::SUMMONS_APPROVED.into(),
            Outcome::SummonsRejected { .. } => names::SUMMONS_REJECTED.into(),
            Outcome::CaseEjected { .. } => names::CASE_EJECTED.into(),
            Outcome::MaterialPending { .. } => names::MATERIAL_PENDING.into(),
            Outcome::MaterialAdded { .. } => names::MATERIAL_ADDED.into(),
            Outcome::MaterialRejected { .. } => names::MATERIAL_REJECTED.into(),
            Outcome::IdpcReceived { .. } => names::IDPC_RECEIVED.into(),
            Outcome::IdpcMatched { .. } => names::IDPC_MATCHED.into(),
            Outcome::IdpcMatchPending { .. } => names::IDPC_MATCH_PENDING.into(),
            Outcome::IdpcAlreadyExists { .. } => names::IDPC_ALREADY_EXISTS.into(),
            Outcome::CpsFormReceived { form_type, .. } => form_type.received_event(),
            Outcome::CpsFormSubmitted { form_type, .. } => form_type.submitted_event(),
            Outcome::CpsMaterialStatusUpdated { .. } => names::CPS_MATERIAL_STATUS_UPDATED.into(),
        }
    }

    /// Receipt notices stay inside the engine.
    pub fn is_public(&self) -> bool {
        !matches!(
            self,
            Outcome::IdpcReceived { .. } | Outcome::CpsFormReceived { .. }
        )
    }

    pub fn case_id(&self) -> Option<Uuid> {
        match self {
            Outcome::ProsecutionReceived { case_id, .. }
            | Outcome::ProsecutionReceivedWithWarnings { case_id, .. }
            | Outcome::ProsecutionRejected { case_id, .. }
            | Outcome::CaseValidationFailed { case_id, .. }
            | Outcome::DefendantValidationFailed { case_id, .. }
            | Outcome::DefendantsParked { case_id, .. }
            | Outcome::SummonsApproved { case_id, .. }
            | Outcome::SummonsRejected { case_id, .. }
            | Outcome::CaseEjected { case_id, .. }
            | Outcome::MaterialAdded { case_id, .. }
            | Outcome::IdpcMatched { case_id, .. }
            | Outcome::IdpcAlreadyExists { case_id, .. }
            | Outcome::CpsFormSubmitted { case_id, .. } => Some(*case_id),
            Outcome::MaterialPending { case_id, .. }
            | Outcome::MaterialRejected { case_id, .. }
            | Outcome::CpsMaterialStatusUpdated { case_id, .. } => *case_id,
            Outcome::IdpcReceived { .. }
            | Outcome::IdpcMatchPending { .. }
            | Outcome::CpsFormReceived { .. } => None,
        }
    }

    pub fn defendant_id(&self) -> Option<Uuid> {
        match self {
            Outcome::DefendantValidationFailed { defendant_id, .. }
            | Outcome::IdpcMatched { defendant_id, .. }
            | Outcome::IdpcAlreadyExists { defendant_id, .. } => Some(*defendant_id),
            Outcome::MaterialAdded { defendant_id, .. } => *defendant_id,
            _ => None,
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            Outcome::ProsecutionReceived {
                urn, defendant_ids, ..
            } => json!({ "urn": urn, "defendantIds": defendant_ids }),
            Outcome::ProsecutionReceivedWithWarnings {
                urn,
                defendant_ids,
                warnings,
                ..
            } => json!({ "urn": urn, "defendantIds": defendant_ids, "warnings": warnings }),
            Outcome::ProsecutionRejected { urn, problems, .. }
            | Outcome::CaseValidationFailed { urn, problems, .. } => {
                json!({ "urn": urn, "problems": problems })
            }
            Outcome::DefendantValidationFailed { problems, .. } => json!({ "problems": problems }),
            Outcome::DefendantsParked {
                urn, defendant_ids, ..
            } => json!({ "urn": urn, "parkedDefendantIds": defendant_ids }),
            Outcome::SummonsApproved { defendant_ids, .. }
            | Outcome::SummonsRejected { defendant_ids, .. } => {
                json!({ "defendantIds": defendant_ids })
            }
            Outcome::CaseEjected { urn, .. } => json!({ "urn": urn }),
            Outcome::MaterialPending {
                material_id,
                reason,
                warnings,
                ..
            } => json!({ "materialId": material_id, "reason": reason, "warnings": warnings }),
            Outcome::MaterialAdded {
                material_id,
                document_type,
                warnings,
                ..
            } => json!({
                "materialId": material_id,
                "documentType": document_type,
                "warnings": warnings
            }),
            Outcome::MaterialRejected {
                material_id,
                problems,
                ..
            } => json!({ "materialId": material_id, "problems": problems }),
            Outcome::IdpcReceived { material_id, urn } => {
                json!({ "materialId": material_id, "urn": urn })
            }
            Outcome::IdpcMatched { material_id, .. }
            | Outcome::IdpcAlreadyExists { material_id, .. } => {
                json!({ "materialId": material_id })
            }
            Outcome::IdpcMatchPending {
                material_id,
                urn,
                reason,
            } => json!({ "materialId": material_id, "urn": urn, "reason": reason }),
            Outcome::CpsFormReceived { form_type, urn } => {
                json!({ "formType": form_type, "urn": urn })
            }
            Outcome::CpsFormSubmitted {
                form_type,
                matched,
                form_data,
                ..
            } => json!({
                "formType": form_type,
                "defendants": matched,
                "formData": form_data
            }),
            Outcome::CpsMaterialStatusUpdated { status, errors, .. } => {
                json!({ "status": status, "errors": errors })
            }
        }
    }

    /// The internal event, followed by the public one where applicable.
    pub fn into_envelopes(self, correlation_id: Uuid, at: DateTime<Utc>) -> Vec<EventEnvelope> {
        let name = self.name();
        let internal = EventEnvelope {
            id: Uuid::new_v4(),
            name: name.clone(),
            visibility: Visibility::Internal,
            correlation_id,
            case_id: self.case_id(),
            defendant_id: self.defendant_id(),
            payload: self.payload(),
            occurred_at: at,
        };
        if !self.is_public() {
            return vec![internal];
        }
        let public = EventEnvelope {
            id: Uuid::new_v4(),
            name: public_name(&name),
            visibility: Visibility::Public,
            ..internal.clone()
        };
        vec![internal, public]
    }
}

/// Envelopes for several outcomes of one correlated operation, in order.
pub fn envelopes(
    outcomes: Vec<Outcome>,
    correlation_id: Uuid,
    at: DateTime<Utc>,
) -> Vec<EventEnvelope> {
    outcomes
        .into_iter()
        .flat_map(|o| o.into_envelopes(correlation_id, at))
        .collect()
}

// ── Sinks ───────────────────────────────────────────────────────────

/// Destination of published events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &EventEnvelope);
}

/// Keeps every event in memory, in publish order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }

    pub fn named(&self, name: &str) -> Vec<EventEnvelope> {
        self.events()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &EventEnvelope) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to live subscribers over a tokio broadcast channel.
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<EventEnvelope>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &EventEnvelope) {
        // No receivers is not an error; events are fire-and-forget.
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(event = %event.name, "No subscribers for event");
        }
    }
}

/// Hands envelopes to the configured sink, logging each one.
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn EventSink>,
}

impl Publisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn publish_all(&self, events: &[EventEnvelope]) {
        for event in events {
            tracing::info!(
                event = %event.name,
                correlation_id = %event.correlation_id,
                case_id = ?event.case_id,
                defendant_id = ?event.defendant_id,
                "Publishing event"
            );
            self.sink.publish(event);
        }
    }
}
