use crate::errors::ConfigError;
use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use super::{
    facade_config::{FacadeSettings, PartialFacadeSettings},
    loader::ConfigLoader,
    log_config::{LogSettings, PartialLogSettings},
};

// Configuration location constants
pub const USER_CONFIG_PATH: &str = "~/.config/scoped-facade";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variables consulted on load
pub const ENV_KEYS: [&str; 4] = [
    "SCOPED_FACADE_CONTEXT_SAFE",
    "SCOPED_FACADE_CACHE_PREFIX",
    "SCOPED_FACADE_LOG_LEVEL",
    "SCOPED_FACADE_LOG_FORMAT",
];

/// Main Application Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub facade: FacadeSettings,
    pub logging: LogSettings,
}

/// Partial Application Configuration for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialAppConfig {
    pub facade: Option<PartialFacadeSettings>,
    pub logging: Option<PartialLogSettings>,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load_config()
    }

    /// Load configuration with custom base path (for testing)
    pub fn load_with_base_path(base_path: PathBuf) -> Result<Self, ConfigError> {
        ConfigLoader::with_base_path(base_path).load_config()
    }

    /// Create AppConfig from partial config and environment
    pub fn from_partial_and_env(
        partial: Option<PartialAppConfig>,
        env_map: HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let partial = partial.unwrap_or_default();

        let facade = FacadeSettings::from_env_or_file(partial.facade, &env_map)?;
        let logging = LogSettings::from_env_or_file(partial.logging, &env_map)?;

        Ok(AppConfig { facade, logging })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn partial_toml_fills_defaults() {
        let partial: PartialAppConfig = toml::from_str(
            r#"
            [facade]
            context_safe = true

            [logging]
            format = "compact"
            "#,
        )
        .unwrap();

        let config = AppConfig::from_partial_and_env(Some(partial), HashMap::new()).unwrap();
        assert!(config.facade.context_safe);
        assert_eq!(config.facade.cache_prefix, "facade.resolved.");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn no_file_no_env_is_default() {
        let config = AppConfig::from_partial_and_env(None, HashMap::new()).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
