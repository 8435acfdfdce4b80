use crate::errors::ConfigError;
use crate::logging::LogFormat;
use serde::Deserialize;
use std::collections::HashMap;

/// Logging settings
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `scoped_facade=debug`
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_format")]
    pub format: LogFormat,
}

/// Partial logging settings for loading from files
#[derive(Deserialize, Debug, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LogSettings {
    pub fn from_env_or_file(
        file: Option<PartialLogSettings>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let level = env_map
            .get("SCOPED_FACADE_LOG_LEVEL")
            .cloned()
            .or_else(|| file.as_ref().and_then(|f| f.level.clone()))
            .unwrap_or_else(default_level);

        let format = match env_map.get("SCOPED_FACADE_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SCOPED_FACADE_LOG_FORMAT".to_string(),
                value: raw.clone(),
            })?,
            None => file
                .as_ref()
                .and_then(|f| f.format)
                .unwrap_or_else(default_format),
        };

        Ok(Self { level, format })
    }
}

// Default functions
fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Pretty
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_env() {
        let mut env = HashMap::new();
        env.insert("SCOPED_FACADE_LOG_FORMAT".to_string(), "JSON".to_string());
        env.insert("SCOPED_FACADE_LOG_LEVEL".to_string(), "debug".to_string());
        let settings = LogSettings::from_env_or_file(None, &env).unwrap();
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.level, "debug");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let mut env = HashMap::new();
        env.insert("SCOPED_FACADE_LOG_FORMAT".to_string(), "xml".to_string());
        assert!(LogSettings::from_env_or_file(None, &env).is_err());
    }
}
