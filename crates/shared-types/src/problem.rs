//! Validation findings: blocking problems and non-blocking warnings.
//!
//! Both share one shape (code, scope, evidence values). The code decides the
//! severity, so a finding can never be filed on the wrong side.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ─── Codes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemCode {
    // case
    DuplicatedProsecution,
    CaseMarkerExpired,
    CaseMarkerInvalid,
    OriginatingOrganisationInvalid,
    InitiationCodeInvalid,
    // defendant
    DefendantDobInFuture,
    DefendantNationalityInvalid,
    DefendantIdRequired,
    DefendantBailStatusInvalid,
    DefendantBailConditionsRequired,
    DefendantUnder18,
    // offence
    OffenceCodeInvalid,
    OffenceChargeDateBeforeCommittedDate,
    OffenceCommittedDateInFuture,
    AlcoholDrugLevelMethodInvalid,
    StatementOfFactsRequired,
    // material
    MaterialExpired,
    InvalidDocumentType,
    FileTypeNotSupported,
    MaterialFileNotFound,
    CaseEjected,
    CaseInActiveSession,
    DefendantDetailsRequired,
    DefendantPersonalInformationMissing,
    DefendantMatchedOnPersonalInformation,
    // cps
    InvalidDefendantsProvided,
    Uncategorized,
}

impl ProblemCode {
    /// Warnings annotate an outcome, everything else blocks it.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ProblemCode::DefendantUnder18
                | ProblemCode::DefendantPersonalInformationMissing
                | ProblemCode::DefendantMatchedOnPersonalInformation
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCode::DuplicatedProsecution => "DUPLICATED_PROSECUTION",
            ProblemCode::CaseMarkerExpired => "CASE_MARKER_EXPIRED",
            ProblemCode::CaseMarkerInvalid => "CASE_MARKER_INVALID",
            ProblemCode::OriginatingOrganisationInvalid => "ORIGINATING_ORGANISATION_INVALID",
            ProblemCode::InitiationCodeInvalid => "INITIATION_CODE_INVALID",
            ProblemCode::DefendantDobInFuture => "DEFENDANT_DOB_IN_FUTURE",
            ProblemCode::DefendantNationalityInvalid => "DEFENDANT_NATIONALITY_INVALID",
            ProblemCode::DefendantIdRequired => "DEFENDANT_ID_REQUIRED",
            ProblemCode::DefendantBailStatusInvalid => "DEFENDANT_BAIL_STATUS_INVALID",
            ProblemCode::DefendantBailConditionsRequired => "DEFENDANT_BAIL_CONDITIONS_REQUIRED",
            ProblemCode::DefendantUnder18 => "DEFENDANT_UNDER_18",
            ProblemCode::OffenceCodeInvalid => "OFFENCE_CODE_INVALID",
            ProblemCode::OffenceChargeDateBeforeCommittedDate => {
                "OFFENCE_CHARGE_DATE_BEFORE_COMMITTED_DATE"
            }
            ProblemCode::OffenceCommittedDateInFuture => "OFFENCE_COMMITTED_DATE_IN_FUTURE",
            ProblemCode::AlcoholDrugLevelMethodInvalid => "ALCOHOL_DRUG_LEVEL_METHOD_INVALID",
            ProblemCode::StatementOfFactsRequired => "STATEMENT_OF_FACTS_REQUIRED",
            ProblemCode::MaterialExpired => "MATERIAL_EXPIRED",
            ProblemCode::InvalidDocumentType => "INVALID_DOCUMENT_TYPE",
            ProblemCode::FileTypeNotSupported => "FILE_TYPE_NOT_SUPPORTED",
            ProblemCode::MaterialFileNotFound => "MATERIAL_FILE_NOT_FOUND",
            ProblemCode::CaseEjected => "CASE_EJECTED",
            ProblemCode::CaseInActiveSession => "CASE_IN_ACTIVE_SESSION",
            ProblemCode::DefendantDetailsRequired => "DEFENDANT_DETAILS_REQUIRED",
            ProblemCode::DefendantPersonalInformationMissing => {
                "DEFENDANT_PERSONAL_INFORMATION_MISSING"
            }
            ProblemCode::DefendantMatchedOnPersonalInformation => {
                "DEFENDANT_MATCHED_ON_PERSONAL_INFORMATION"
            }
            ProblemCode::InvalidDefendantsProvided => "INVALID_DEFENDANTS_PROVIDED",
            ProblemCode::Uncategorized => "UNCATEGORIZED",
        }
    }
}

impl fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Scope ─────────────────────────────────────────────────────

/// What a finding is attached to. Offences are addressed by their 1-based
/// sequence within the defendant so duplicates of one code stay distinct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Scope {
    Case,
    Defendant { defendant_id: Uuid },
    Offence { defendant_id: Uuid, offence_sequence: u32 },
}

impl Scope {
    pub fn defendant_id(&self) -> Option<Uuid> {
        match self {
            Scope::Case => None,
            Scope::Defendant { defendant_id } | Scope::Offence { defendant_id, .. } => {
                Some(*defendant_id)
            }
        }
    }

    pub fn is_case(&self) -> bool {
        matches!(self, Scope::Case)
    }
}

// ─── Findings ──────────────────────────────────────────────────

/// One piece of evidence, e.g. `{"key": "dateOfBirth", "value": "2030-01-01"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemValue {
    pub key: String,
    pub value: String,
}

impl ProblemValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A validation finding. Whether it blocks is decided by `code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    pub code: ProblemCode,
    pub scope: Scope,
    #[serde(default)]
    pub values: Vec<ProblemValue>,
}

impl Problem {
    pub fn new(code: ProblemCode, scope: Scope) -> Self {
        Self {
            code,
            scope,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push(ProblemValue::new(key, value));
        self
    }

    pub fn is_warning(&self) -> bool {
        self.code.is_warning()
    }

    /// First evidence value recorded under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }
}

/// Complete result of one evaluation. Order is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    pub problems: Vec<Problem>,
    pub warnings: Vec<Problem>,
}

impl ValidationReport {
    /// File a finding on the side its code dictates.
    pub fn push(&mut self, finding: Problem) {
        if finding.is_warning() {
            self.warnings.push(finding);
        } else {
            self.problems.push(finding);
        }
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Problem>) {
        for finding in findings {
            self.push(finding);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.problems.is_empty() && self.warnings.is_empty()
    }

    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    pub fn case_problems(&self) -> Vec<&Problem> {
        self.problems.iter().filter(|p| p.scope.is_case()).collect()
    }

    /// Defendant- and offence-scoped problems for one defendant.
    pub fn defendant_problems(&self, defendant_id: Uuid) -> Vec<&Problem> {
        self.problems
            .iter()
            .filter(|p| p.scope.defendant_id() == Some(defendant_id))
            .collect()
    }

    pub fn codes(&self) -> Vec<ProblemCode> {
        self.problems.iter().map(|p| p.code).collect()
    }
}
