use serde::{Deserialize, Serialize};

/// Feature flags controlling optional side effects of the engine.
///
/// Loaded from `intake.toml` at startup. A missing or incomplete config
/// file keeps notifications off and downstream document attachment on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureFlags {
    /// Send validation-failure e-mails to the informant.
    #[serde(default)]
    pub notifications: bool,
    /// Forward defendant-level court documents to the case-management system.
    #[serde(default = "default_true")]
    pub downstream_attach: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            notifications: false,
            downstream_attach: true,
        }
    }
}
