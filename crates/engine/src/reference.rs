//! Reference data consulted by the rule set and the material manager.
//!
//! Lookups are synchronous. An `Err` always means the lookup service could
//! not answer; an unknown code is `Ok(None)` / `Ok(false)`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_types::AppError;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// An offence code and the window it may be charged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffenceReference {
    pub code: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeReference {
    pub code: String,
    /// Court documents attached to a defendant are forwarded to the CMS.
    #[serde(default)]
    pub court_document: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BailStatusReference {
    pub code: String,
    #[serde(default)]
    pub conditions_required: bool,
}

pub trait ReferenceData: Send + Sync {
    fn offence(&self, code: &str) -> Result<Option<OffenceReference>, AppError>;
    fn document_type(&self, code: &str) -> Result<Option<DocumentTypeReference>, AppError>;
    fn bail_status(&self, code: &str) -> Result<Option<BailStatusReference>, AppError>;
    fn is_nationality(&self, code: &str) -> Result<bool, AppError>;
    fn is_alcohol_level_method(&self, code: &str) -> Result<bool, AppError>;
    fn is_organisation_unit(&self, code: &str) -> Result<bool, AppError>;
    fn is_case_marker(&self, code: &str) -> Result<bool, AppError>;
}

// ── Static implementation ───────────────────────────────────────────

/// File layout for [`StaticReferenceData`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceFile {
    #[serde(default)]
    pub offences: Vec<OffenceReference>,
    #[serde(default)]
    pub document_types: Vec<DocumentTypeReference>,
    #[serde(default)]
    pub bail_statuses: Vec<BailStatusReference>,
    #[serde(default)]
    pub nationalities: Vec<String>,
    #[serde(default)]
    pub alcohol_level_methods: Vec<String>,
    #[serde(default)]
    pub organisation_units: Vec<String>,
    #[serde(default)]
    pub case_markers: Vec<String>,
}

/// In-memory reference data. Codes are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceData {
    offences: HashMap<String, OffenceReference>,
    document_types: HashMap<String, DocumentTypeReference>,
    bail_statuses: HashMap<String, BailStatusReference>,
    nationalities: HashSet<String>,
    alcohol_level_methods: HashSet<String>,
    organisation_units: HashSet<String>,
    case_markers: HashSet<String>,
}

fn key(code: &str) -> String {
    code.trim().to_uppercase()
}

impl StaticReferenceData {
    pub fn from_file(file: ReferenceFile) -> Self {
        Self {
            offences: file
                .offences
                .into_iter()
                .map(|o| (key(&o.code), o))
                .collect(),
            document_types: file
                .document_types
                .into_iter()
                .map(|d| (key(&d.code), d))
                .collect(),
            bail_statuses: file
                .bail_statuses
                .into_iter()
                .map(|b| (key(&b.code), b))
                .collect(),
            nationalities: file.nationalities.iter().map(|c| key(c)).collect(),
            alcohol_level_methods: file.alcohol_level_methods.iter().map(|c| key(c)).collect(),
            organisation_units: file.organisation_units.iter().map(|c| key(c)).collect(),
            case_markers: file.case_markers.iter().map(|c| key(c)).collect(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, AppError> {
        let file: ReferenceFile = toml::from_str(contents)
            .map_err(|e| AppError::structural(format!("Invalid reference data: {}", e)))?;
        Ok(Self::from_file(file))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::unavailable(format!(
                "Cannot read reference data {}: {}",
                path.display(),
                e
            ))
        })?;
        let data = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            offences = data.offences.len(),
            document_types = data.document_types.len(),
            "Reference data loaded"
        );
        Ok(data)
    }
}

impl ReferenceData for StaticReferenceData {
    fn offence(&self, code: &str) -> Result<Option<OffenceReference>, AppError> {
        Ok(self.offences.get(&key(code)).cloned())
    }

    fn document_type(&self, code: &str) -> Result<Option<DocumentTypeReference>, AppError> {
        Ok(self.document_types.get(&key(code)).cloned())
    }

    fn bail_status(&self, code: &str) -> Result<Option<BailStatusReference>, AppError> {
        Ok(self.bail_statuses.get(&key(code)).cloned())
    }

    fn is_nationality(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.nationalities.contains(&key(code)))
    }

    fn is_alcohol_level_method(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.alcohol_level_methods.contains(&key(code)))
    }

    fn is_organisation_unit(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.organisation_units.contains(&key(code)))
    }

    fn is_case_marker(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.case_markers.contains(&key(code)))
    }
}
