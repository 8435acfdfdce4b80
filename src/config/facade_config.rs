use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

/// Facade dispatch settings
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FacadeSettings {
    /// Default cache placement for facades without an explicit mode
    #[serde(default = "default_context_safe")]
    pub context_safe: bool,

    /// Key prefix for facade instances cached in the context store
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,
}

/// Partial facade settings for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialFacadeSettings {
    pub context_safe: Option<bool>,
    pub cache_prefix: Option<String>,
}

impl Default for FacadeSettings {
    fn default() -> Self {
        Self {
            context_safe: default_context_safe(),
            cache_prefix: default_cache_prefix(),
        }
    }
}

impl FacadeSettings {
    /// Environment wins over file, file over defaults.
    pub fn from_env_or_file(
        file: Option<PartialFacadeSettings>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let context_safe = match env_map.get("SCOPED_FACADE_CONTEXT_SAFE") {
            Some(raw) => parse_bool("SCOPED_FACADE_CONTEXT_SAFE", raw)?,
            None => file
                .as_ref()
                .and_then(|f| f.context_safe)
                .unwrap_or_else(default_context_safe),
        };

        let cache_prefix = env_map
            .get("SCOPED_FACADE_CACHE_PREFIX")
            .cloned()
            .or_else(|| file.as_ref().and_then(|f| f.cache_prefix.clone()))
            .unwrap_or_else(default_cache_prefix);

        if cache_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "facade.cache_prefix".to_string(),
                value: cache_prefix,
            });
        }

        Ok(Self {
            context_safe,
            cache_prefix,
        })
    }
}

pub(crate) fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

// Default functions
fn default_context_safe() -> bool {
    false
}

fn default_cache_prefix() -> String {
    "facade.resolved.".to_string()
}
