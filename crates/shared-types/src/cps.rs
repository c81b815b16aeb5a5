//! Court forms served by the prosecution service. Forms carry a case urn but
//! no case id, and identify defendants only by the keys the prosecutor holds.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::event::EventEnvelope;
use crate::problem::Problem;

#[cfg(feature = "validation")]
use validator::Validate;

// ── Form types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CpsFormType {
    /// Preparation for effective trial.
    Pet,
    /// Better case management.
    Bcm,
    /// Certificate of trial readiness.
    Cotr,
    /// Plea and trial preparation hearing.
    Ptph,
    CotrUpdate,
}

impl CpsFormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpsFormType::Pet => "pet",
            CpsFormType::Bcm => "bcm",
            CpsFormType::Cotr => "cotr",
            CpsFormType::Ptph => "ptph",
            CpsFormType::CotrUpdate => "cotr-update",
        }
    }

    /// Internal event announcing receipt, e.g. `cps-serve.pet.received`.
    pub fn received_event(&self) -> String {
        format!("cps-serve.{}.received", self.as_str())
    }

    /// Event carrying the matched defendants, e.g. `cps-serve.pet.submitted`.
    pub fn submitted_event(&self) -> String {
        format!("cps-serve.{}.submitted", self.as_str())
    }
}

impl fmt::Display for CpsFormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Submission ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CpsFormSubmission {
    pub submission_id: Uuid,
    pub form_type: CpsFormType,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case URN is required"))
    )]
    pub urn: String,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "At least one defendant is required"))
    )]
    pub defendants: Vec<FormDefendant>,
    /// Form body, passed through untouched.
    #[serde(default)]
    pub form_data: serde_json::Value,
}

/// A defendant as named on a form. Any subset of keys may be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDefendant {
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
}

impl FormDefendant {
    pub fn name_dob(&self) -> Option<MatchKey> {
        match (&self.forename, &self.surname, self.date_of_birth) {
            (Some(forename), Some(surname), Some(date_of_birth)) => Some(MatchKey::NameDob {
                forename: forename.clone(),
                surname: surname.clone(),
                date_of_birth,
            }),
            _ => None,
        }
    }

    /// Keys offered for matching, in strategy priority order.
    pub fn keys(&self) -> Vec<MatchKey> {
        let mut keys = Vec::new();
        if let Some(asn) = non_blank(&self.asn) {
            keys.push(MatchKey::Asn(asn.to_string()));
        }
        if let Some(id) = non_blank(&self.cps_defendant_id) {
            keys.push(MatchKey::ExternalId(id.to_string()));
        }
        if let Some(key) = self.name_dob() {
            keys.push(key);
        }
        keys
    }

    /// Key reported when this defendant fails to match: ASN first, then CPS
    /// id, then name and date of birth.
    pub fn reported_key(&self) -> Option<MatchKey> {
        self.keys().into_iter().next()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ── Matching ────────────────────────────────────────────────────────

/// Strategy that produced (or failed to produce) a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MatchKey {
    Asn(String),
    ExternalId(String),
    NameDob {
        forename: String,
        surname: String,
        date_of_birth: NaiveDate,
    },
}

impl MatchKey {
    pub fn evidence_key(&self) -> &'static str {
        match self {
            MatchKey::Asn(_) => "asn",
            MatchKey::ExternalId(_) => "cpsDefendantId",
            MatchKey::NameDob { .. } => "nameAndDateOfBirth",
        }
    }

    pub fn evidence_value(&self) -> String {
        match self {
            MatchKey::Asn(v) | MatchKey::ExternalId(v) => v.clone(),
            MatchKey::NameDob {
                forename,
                surname,
                date_of_birth,
            } => format!("{} {} {}", forename, surname, date_of_birth),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedDefendant {
    /// Position of the defendant on the form.
    pub form_index: usize,
    pub defendant_id: Uuid,
    pub key: MatchKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedDefendant {
    pub form_index: usize,
    /// `None` when the form offered no identifying key at all.
    pub key: Option<MatchKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: Vec<MatchedDefendant>,
    pub unmatched: Vec<UnmatchedDefendant>,
}

impl MatchResult {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Status carried by `cps-serve.material-status-updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Success,
    Rejected,
}

/// How a form submission was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpsResolution {
    /// No case found locally or downstream for the urn.
    Unresolved,
    Submitted,
    Rejected,
}

/// Processed form submission, kept so redeliveries replay the same events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpsSubmissionRecord {
    pub submission_id: Uuid,
    pub form_type: CpsFormType,
    pub urn: String,
    pub case_id: Option<Uuid>,
    pub resolution: CpsResolution,
    pub matches: MatchResult,
    pub problems: Vec<Problem>,
    pub events: Vec<EventEnvelope>,
    pub received_at: DateTime<Utc>,
}
