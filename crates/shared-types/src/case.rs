use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::event::EventEnvelope;
use crate::problem::Problem;
use crate::prosecution::{AlcoholLevel, CaseMarker, Channel, Defendant, Prosecution};

// ── Status ──────────────────────────────────────────────────────────

/// Lifecycle of a case inside the intake engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Received,
    Validating,
    Accepted,
    AcceptedWithWarnings,
    PartiallyRejected,
    /// Summons defendants held pending application approval.
    ParkedForApproval,
    Ejected,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Received => "received",
            CaseStatus::Validating => "validating",
            CaseStatus::Accepted => "accepted",
            CaseStatus::AcceptedWithWarnings => "accepted_with_warnings",
            CaseStatus::PartiallyRejected => "partially_rejected",
            CaseStatus::ParkedForApproval => "parked_for_approval",
            CaseStatus::Ejected => "ejected",
        }
    }

    /// Accepted in either flavour; the case exists downstream.
    pub fn is_accepted(&self) -> bool {
        matches!(self, CaseStatus::Accepted | CaseStatus::AcceptedWithWarnings)
    }
}

/// Exclusive session held on a case (e.g. a hearing in progress). While held,
/// no material may be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Exclusive { session_id: Uuid },
}

/// Progress of the downstream case-management creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownstreamStatus {
    NotRequested,
    Pending,
    Created,
    Failed { reason: String },
}

// ── Aggregate ───────────────────────────────────────────────────────

/// Case-level fields replaced by each submission or case-level correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetails {
    pub initiation_code: String,
    pub originating_organisation: String,
    pub case_markers: Vec<CaseMarker>,
    pub informant_email: Option<String>,
    pub summons: bool,
}

/// Per-case aggregate. All writes go through a compare-and-swap on `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: Uuid,
    pub urn: String,
    pub channel: Channel,
    pub version: u64,
    pub status: CaseStatus,
    pub details: CaseDetails,
    /// Defendants attached to the case or awaiting correction.
    pub defendants: Vec<Defendant>,
    /// Summons defendants validated clean and awaiting approval.
    pub parked_defendants: Vec<Defendant>,
    /// Open blocking problems at every scope.
    pub problems: Vec<Problem>,
    /// Warnings of the latest evaluation.
    pub warnings: Vec<Problem>,
    pub session: SessionState,
    pub downstream: DownstreamStatus,
    /// Events recorded per processed submission id, replayed on redelivery.
    #[serde(default)]
    pub processed_submissions: HashMap<Uuid, Vec<EventEnvelope>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Rebuild the canonical prosecution the rule engine evaluates.
    pub fn to_prosecution(&self, submission_id: Uuid) -> Prosecution {
        Prosecution {
            submission_id,
            case_id: self.case_id,
            urn: self.urn.clone(),
            channel: self.channel,
            initiation_code: self.details.initiation_code.clone(),
            originating_organisation: self.details.originating_organisation.clone(),
            case_markers: self.details.case_markers.clone(),
            informant_email: self.details.informant_email.clone(),
            defendants: self.defendants.clone(),
            summons: self.details.summons,
        }
    }

    pub fn defendant(&self, id: Uuid) -> Option<&Defendant> {
        self.defendants.iter().find(|d| d.id == id)
    }

    pub fn defendant_mut(&mut self, id: Uuid) -> Option<&mut Defendant> {
        self.defendants.iter_mut().find(|d| d.id == id)
    }

    pub fn defendant_by_reference(&self, reference: &str) -> Option<&Defendant> {
        self.defendants
            .iter()
            .find(|d| d.prosecutor_reference.as_deref() == Some(reference))
    }

    pub fn is_parked(&self, id: Uuid) -> bool {
        self.parked_defendants.iter().any(|d| d.id == id)
    }

    pub fn case_problems(&self) -> Vec<&Problem> {
        self.problems.iter().filter(|p| p.scope.is_case()).collect()
    }

    pub fn defendant_problems(&self, defendant_id: Uuid) -> Vec<&Problem> {
        self.problems
            .iter()
            .filter(|p| p.scope.defendant_id() == Some(defendant_id))
            .collect()
    }

    /// Materials may only attach to an accepted case outside a session.
    pub fn accepts_material(&self) -> bool {
        self.status.is_accepted() && self.session == SessionState::Open
    }

    pub fn roster(&self) -> CaseRoster {
        CaseRoster {
            case_id: self.case_id,
            urn: self.urn.clone(),
            defendants: self.defendants.iter().map(RosterDefendant::from).collect(),
        }
    }
}

// ── Roster (matching view) ──────────────────────────────────────────

/// Identifying keys of a case's defendants, from the local aggregate or the
/// downstream case-management system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRoster {
    pub case_id: Uuid,
    pub urn: String,
    pub defendants: Vec<RosterDefendant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterDefendant {
    pub defendant_id: Uuid,
    #[serde(default)]
    pub prosecutor_reference: Option<String>,
    #[serde(default)]
    pub asn: Option<String>,
    #[serde(default)]
    pub cps_defendant_id: Option<String>,
    #[serde(default)]
    pub forename: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub organisation_name: Option<String>,
}

impl From<&Defendant> for RosterDefendant {
    fn from(d: &Defendant) -> Self {
        let person = d.person();
        Self {
            defendant_id: d.id,
            prosecutor_reference: d.prosecutor_reference.clone(),
            asn: d.asn.clone(),
            cps_defendant_id: d.cps_defendant_id.clone(),
            forename: person.map(|p| p.forename.clone()),
            surname: person.map(|p| p.surname.clone()),
            date_of_birth: person.and_then(|p| p.date_of_birth),
            organisation_name: match &d.details {
                crate::prosecution::DefendantDetails::Organisation(o) => Some(o.name.clone()),
                crate::prosecution::DefendantDetails::Person(_) => None,
            },
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// A correction against an existing case, scoped to the case or one defendant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub submission_id: Uuid,
    pub case_id: Uuid,
    pub target: CorrectionTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CorrectionTarget {
    Case(CaseCorrection),
    Defendant {
        defendant_id: Uuid,
        correction: DefendantCorrection,
    },
}

/// Only provided fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseCorrection {
    #[serde(default)]
    pub initiation_code: Option<String>,
    #[serde(default)]
    pub originating_organisation: Option<String>,
    #[serde(default)]
    pub case_markers: Option<Vec<CaseMarker>>,
}

/// Only provided fields are changed. Offences are addressed by sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefendantCorrection {
    #[serde(default)]
    pub prosecutor_reference: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub bail_status: Option<String>,
    #[serde(default)]
    pub bail_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub offences: Vec<OffenceCorrection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffenceCorrection {
    pub sequence: u32,
    #[serde(default)]
    pub offence_code: Option<String>,
    #[serde(default)]
    pub committed_date: Option<NaiveDate>,
    #[serde(default)]
    pub charge_date: Option<NaiveDate>,
    #[serde(default)]
    pub alcohol_level: Option<AlcoholLevel>,
    #[serde(default)]
    pub statement_of_facts: Option<String>,
}

/// External decision on a summons application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummonsDecision {
    pub submission_id: Uuid,
    pub case_id: Uuid,
    /// Empty means every parked defendant.
    #[serde(default)]
    pub defendant_ids: Vec<Uuid>,
}

/// Outcome returned to the caller of a case command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case_id: Uuid,
    pub status: CaseStatus,
    pub version: u64,
    pub problems: Vec<Problem>,
    pub warnings: Vec<Problem>,
    /// True when the outcome was replayed for a redelivered submission.
    pub replayed: bool,
}
