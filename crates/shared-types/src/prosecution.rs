use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::AppError;

#[cfg(feature = "validation")]
use validator::{Validate, ValidationError};

// ── Channels and codes ──────────────────────────────────────────────

/// Upstream channel a submission arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Police/prosecutor system posting one case at a time.
    DirectSubmission,
    /// Scheduled batch feed; may re-send known cases.
    BatchFeed,
    /// Keyed in by court staff.
    ManualEntry,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::DirectSubmission => "direct_submission",
            Channel::BatchFeed => "batch_feed",
            Channel::ManualEntry => "manual_entry",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case initiation codes accepted by the rule set.
/// C=charge, J=single justice procedure notice, O=other, Q=requisition (organisation),
/// R=requisition, S=summons, Z=other (no charge).
pub const INITIATION_CODES: &[&str] = &["C", "J", "O", "Q", "R", "S", "Z"];

/// Check whether an initiation code is one the rule set knows.
pub fn is_valid_initiation_code(s: &str) -> bool {
    INITIATION_CODES.contains(&s)
}

// ── Raw submission (as received) ────────────────────────────────────

/// A prosecution exactly as an upstream channel delivered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct SubmitProsecutionRequest {
    pub submission_id: Uuid,
    pub case_id: Uuid,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 32, message = "URN is required"))
    )]
    pub urn: String,
    pub channel: Channel,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Initiation code is required"))
    )]
    pub initiation_code: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Originating organisation is required"))
    )]
    pub originating_organisation: String,
    #[serde(default)]
    #[cfg_attr(feature = "validation", validate(nested))]
    pub case_markers: Vec<CaseMarkerInput>,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Informant email must be a valid address"))
    )]
    pub informant_email: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(
            length(min = 1, message = "At least one defendant is required"),
            nested
        )
    )]
    pub defendants: Vec<DefendantInput>,
}

impl SubmitProsecutionRequest {
    /// Parse a channel payload. Unknown or malformed fields are structural errors.
    pub fn from_json(value: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(value)
            .map_err(|e| AppError::structural(format!("Malformed prosecution submission: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct CaseMarkerInput {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Case marker code is required"))
    )]
    pub code: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
#[cfg_attr(
    feature = "validation",
    validate(schema(function = "validate_defendant_details"))
)]
pub struct DefendantInput {
    /// Channel-assigned id. Derived deterministically when absent.
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub prosecutor_reference: Option<String>,
    #[serde(default)]
    pub asn: Option<String>,
    #[serde(default)]
    pub cps_defendant_id: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "validation", validate(nested))]
    pub person: Option<PersonInput>,
    #[serde(default)]
    #[cfg_attr(feature = "validation", validate(nested))]
    pub organisation: Option<OrganisationInput>,
    #[serde(default)]
    pub bail_status: Option<String>,
    #[serde(default)]
    pub bail_conditions: Vec<String>,
    #[cfg_attr(
        feature = "validation",
        validate(
            length(min = 1, message = "Each defendant needs at least one offence"),
            nested
        )
    )]
    pub offences: Vec<OffenceInput>,
}

#[cfg(feature = "validation")]
fn validate_defendant_details(defendant: &DefendantInput) -> Result<(), ValidationError> {
    let message = match (&defendant.person, &defendant.organisation) {
        (Some(_), None) | (None, Some(_)) => return Ok(()),
        (None, None) => "Defendant needs person or organisation details",
        (Some(_), Some(_)) => "Defendant cannot be both a person and an organisation",
    };
    let mut err = ValidationError::new("defendant_details");
    err.message = Some(message.into());
    Err(err)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct PersonInput {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Forename is required"))
    )]
    pub forename: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Surname is required"))
    )]
    pub surname: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct OrganisationInput {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Organisation name is required"))
    )]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[cfg_attr(feature = "validation", derive(Validate))]
pub struct OffenceInput {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Offence code is required"))
    )]
    pub offence_code: String,
    pub committed_date: NaiveDate,
    #[serde(default)]
    pub charge_date: Option<NaiveDate>,
    #[serde(default)]
    pub alcohol_level: Option<AlcoholLevel>,
    #[serde(default)]
    pub statement_of_facts: Option<String>,
}

// ── Canonical shape ────────────────────────────────────────────────

/// Canonical prosecution produced by the normalizer. Every channel ends here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prosecution {
    pub submission_id: Uuid,
    pub case_id: Uuid,
    pub urn: String,
    pub channel: Channel,
    pub initiation_code: String,
    pub originating_organisation: String,
    pub case_markers: Vec<CaseMarker>,
    pub informant_email: Option<String>,
    pub defendants: Vec<Defendant>,
    /// Set when the initiation code routes defendants to summons parking.
    pub summons: bool,
}

impl Prosecution {
    pub fn defendant(&self, id: Uuid) -> Option<&Defendant> {
        self.defendants.iter().find(|d| d.id == id)
    }

    pub fn defendant_mut(&mut self, id: Uuid) -> Option<&mut Defendant> {
        self.defendants.iter_mut().find(|d| d.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMarker {
    pub code: String,
    pub expiry_date: Option<NaiveDate>,
}

/// A defendant within one case. Holds the case only by foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defendant {
    pub id: Uuid,
    pub prosecutor_reference: Option<String>,
    pub asn: Option<String>,
    pub cps_defendant_id: Option<String>,
    pub details: DefendantDetails,
    pub bail_status: Option<String>,
    pub bail_conditions: Vec<String>,
    pub offences: Vec<Offence>,
}

impl Defendant {
    pub fn person(&self) -> Option<&PersonDetails> {
        match &self.details {
            DefendantDetails::Person(p) => Some(p),
            DefendantDetails::Organisation(_) => None,
        }
    }

    pub fn is_organisation(&self) -> bool {
        matches!(self.details, DefendantDetails::Organisation(_))
    }

    pub fn offence(&self, sequence: u32) -> Option<&Offence> {
        self.offences.iter().find(|o| o.sequence == sequence)
    }

    pub fn offence_mut(&mut self, sequence: u32) -> Option<&mut Offence> {
        self.offences.iter_mut().find(|o| o.sequence == sequence)
    }

    /// Display label used in event payloads.
    pub fn display_name(&self) -> String {
        match &self.details {
            DefendantDetails::Person(p) => format!("{} {}", p.forename, p.surname),
            DefendantDetails::Organisation(o) => o.name.clone(),
        }
    }

    pub fn earliest_charge_date(&self) -> Option<NaiveDate> {
        self.offences.iter().filter_map(|o| o.charge_date).min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefendantDetails {
    Person(PersonDetails),
    Organisation(OrganisationDetails),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDetails {
    pub forename: String,
    pub surname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationDetails {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offence {
    /// 1-based position within the defendant, stable across corrections.
    pub sequence: u32,
    pub code: String,
    pub committed_date: NaiveDate,
    pub charge_date: Option<NaiveDate>,
    pub alcohol_level: Option<AlcoholLevel>,
    pub statement_of_facts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlcoholLevel {
    pub method: String,
    #[serde(default)]
    pub amount: Option<u32>,
}
