use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::feature_flags::FeatureFlags;
use crate::material::TimerClass;
use crate::prosecution::Channel;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Top-level config file structure matching `intake.toml`.
///
/// Every section is optional; missing sections fall back to the defaults
/// documented on each field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub materials: MaterialConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub dedup: DedupPolicy,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Expiry windows for pending materials, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerConfig {
    #[serde(default = "default_standard_secs")]
    pub standard_secs: u64,
    #[serde(default = "default_bulk_scan_secs")]
    pub bulk_scan_secs: u64,
}

fn default_standard_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_bulk_scan_secs() -> u64 {
    28 * 24 * 60 * 60
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            standard_secs: default_standard_secs(),
            bulk_scan_secs: default_bulk_scan_secs(),
        }
    }
}

impl TimerConfig {
    pub fn duration(&self, class: TimerClass) -> Duration {
        match class {
            TimerClass::Standard => Duration::from_secs(self.standard_secs),
            TimerClass::BulkScan => Duration::from_secs(self.bulk_scan_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialConfig {
    #[serde(default = "default_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// Lower-case, without the dot.
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Document type recorded for IDPC bundles.
    #[serde(default = "default_idpc_document_type")]
    pub idpc_document_type: String,
}

fn default_mime_types() -> Vec<String> {
    [
        "application/pdf",
        "application/msword",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "image/jpeg",
        "image/png",
        "image/tiff",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "jpg", "jpeg", "png", "tif", "tiff", "txt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_idpc_document_type() -> String {
    "IDPC".to_string()
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            allowed_mime_types: default_mime_types(),
            allowed_extensions: default_extensions(),
            idpc_document_type: default_idpc_document_type(),
        }
    }
}

impl MaterialConfig {
    /// Both the MIME type and the file extension must be on the allow lists.
    pub fn is_supported(&self, mime_type: &str, file_name: &str) -> bool {
        let mime_ok = self
            .allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime_type.trim()));
        let ext_ok = file_name
            .rsplit_once('.')
            .map(|(_, ext)| {
                self.allowed_extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        mime_ok && ext_ok
    }
}

/// Tunables for the business rule set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConfig {
    /// Initiation code that routes clean defendants to summons parking.
    #[serde(default = "default_summons_code")]
    pub summons_code: String,
    /// Initiation codes whose offences need a statement of facts.
    #[serde(default = "default_sof_codes")]
    pub statement_of_facts_codes: Vec<String>,
    /// Channels the statement-of-facts rule applies to. Empty means all.
    #[serde(default)]
    pub statement_of_facts_channels: Vec<Channel>,
    /// Channels where every defendant needs a prosecutor reference.
    #[serde(default = "default_reference_channels")]
    pub defendant_reference_channels: Vec<Channel>,
    #[serde(default = "default_adult_age")]
    pub adult_age: u32,
}

fn default_summons_code() -> String {
    "S".to_string()
}

fn default_sof_codes() -> Vec<String> {
    vec!["J".to_string()]
}

fn default_reference_channels() -> Vec<Channel> {
    vec![Channel::BatchFeed]
}

fn default_adult_age() -> u32 {
    18
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            summons_code: default_summons_code(),
            statement_of_facts_codes: default_sof_codes(),
            statement_of_facts_channels: Vec::new(),
            defendant_reference_channels: default_reference_channels(),
            adult_age: default_adult_age(),
        }
    }
}

impl RuleConfig {
    pub fn requires_statement_of_facts(&self, initiation_code: &str, channel: Channel) -> bool {
        self.statement_of_facts_codes
            .iter()
            .any(|c| c == initiation_code)
            && (self.statement_of_facts_channels.is_empty()
                || self.statement_of_facts_channels.contains(&channel))
    }

    pub fn requires_defendant_reference(&self, channel: Channel) -> bool {
        self.defendant_reference_channels.contains(&channel)
    }

    pub fn is_summons(&self, initiation_code: &str) -> bool {
        self.summons_code == initiation_code
    }
}

/// When repeated prosecutor references collapse into one defendant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupPolicy {
    #[serde(default = "default_dedup_channels")]
    pub channels: Vec<Channel>,
    /// Only dedup when the case is already known.
    #[serde(default = "default_true")]
    pub resubmission_only: bool,
    #[serde(default)]
    pub include_organisations: bool,
}

fn default_dedup_channels() -> Vec<Channel> {
    vec![Channel::BatchFeed]
}

fn default_true() -> bool {
    true
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            channels: default_dedup_channels(),
            resubmission_only: true,
            include_organisations: false,
        }
    }
}

impl DedupPolicy {
    pub fn applies(&self, channel: Channel, is_resubmission: bool) -> bool {
        self.channels.contains(&channel) && (is_resubmission || !self.resubmission_only)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// Initiation codes whose validation failures are e-mailed.
    #[serde(default = "default_notification_codes")]
    pub initiation_codes: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_notification_codes() -> Vec<String> {
    vec!["S".to_string()]
}

fn default_subject_prefix() -> String {
    "[Case Intake]".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            initiation_codes: default_notification_codes(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

/// Backoff for collaborator calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> usize {
    3
}

fn default_min_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcurrencyConfig {
    /// Compare-and-swap attempts before a case write gives up with `Conflict`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    5
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}
