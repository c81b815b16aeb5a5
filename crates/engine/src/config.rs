use shared_types::{AppError, EngineConfig};
use std::path::Path;

/// Default config path, relative to the working directory.
const CONFIG_PATH: &str = "intake.toml";

/// Environment variable overriding [`CONFIG_PATH`].
const CONFIG_PATH_VAR: &str = "INTAKE_CONFIG";

/// Load the engine config from `$INTAKE_CONFIG` or `intake.toml`.
///
/// A missing or unparseable file is logged and every section falls back to
/// its defaults, so the engine always starts.
pub fn load_config() -> EngineConfig {
    let _ = dotenvy::dotenv();
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| CONFIG_PATH.to_string());

    match load_config_from(&path) {
        Ok(config) => {
            tracing::info!(path = %path, features = ?config.features, "Config loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Config unavailable, using defaults");
            EngineConfig::default()
        }
    }
}

/// Read and parse one config file.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<EngineConfig, AppError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::not_found(format!("{}: {}", path.display(), e)))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<EngineConfig, AppError> {
    toml::from_str(contents).map_err(|e| AppError::structural(format!("Invalid config: {}", e)))
}
