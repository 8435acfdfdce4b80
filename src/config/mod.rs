pub mod app_config;
pub mod facade_config;
pub mod loader;
pub mod log_config;

// Re-export commonly used types
pub use app_config::{AppConfig, PartialAppConfig};
pub use facade_config::{FacadeSettings, PartialFacadeSettings};
pub use loader::ConfigLoader;
pub use log_config::{LogSettings, PartialLogSettings};

// Re-export constants
pub use app_config::{CONFIG_FILE_NAME, ENV_KEYS, USER_CONFIG_PATH};
