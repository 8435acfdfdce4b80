use thiserror::Error;

/// Failures raised while turning an abstract id into an object graph.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Unable to resolve parameter ${parameter} of {target}")]
    UnresolvedDependency { parameter: String, target: String },

    #[error("Type {0} not found")]
    UnknownType(String),

    #[error("Type {0} is not instantiable")]
    NotInstantiable(String),

    #[error("Factory for '{abstract_id}' must return an object, got {found}")]
    InvalidFactoryResult { abstract_id: String, found: String },

    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    #[error("Failed to construct '{type_name}': {source}")]
    ConstructionFailed {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Type mismatch for '{abstract_id}': expected {expected}, found {actual}")]
    TypeMismatch {
        abstract_id: String,
        expected: String,
        actual: String,
    },
}

/// Failures raised by facade resolution and forwarding.
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("Unknown facade: {0}")]
    UnknownFacade(String),

    #[error("Container not set for facade {facade}")]
    ContainerNotSet { facade: String },

    #[error("No resolved instance for facade: {facade} (service '{service_id}')")]
    NoResolvedInstance { facade: String, service_id: String },

    #[error("Resolved instance for {facade} is not an object (got {found})")]
    NotAnObject { facade: String, found: String },

    #[error("Undefined method {method} for facade {facade}")]
    UndefinedMethod { facade: String, method: String },

    #[error("Error invoking method {method} on facade {facade}: {source}")]
    InvocationError {
        facade: String,
        method: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Container lookup of '{service_id}' for facade {facade} failed: {source}")]
    Lookup {
        facade: String,
        service_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to resolve '{service_id}' for facade {facade} in this context: {source}")]
    Resolution {
        facade: String,
        service_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Type mismatch for facade {facade}: expected {expected}, found {actual}")]
    TypeMismatch {
        facade: String,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Facade error: {0}")]
    Facade(#[from] FacadeError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl FacadeError {
    /// Facade the failure is attributed to.
    pub fn facade(&self) -> &str {
        match self {
            FacadeError::UnknownFacade(facade) => facade,
            FacadeError::ContainerNotSet { facade }
            | FacadeError::NoResolvedInstance { facade, .. }
            | FacadeError::NotAnObject { facade, .. }
            | FacadeError::UndefinedMethod { facade, .. }
            | FacadeError::InvocationError { facade, .. }
            | FacadeError::Lookup { facade, .. }
            | FacadeError::Resolution { facade, .. }
            | FacadeError::TypeMismatch { facade, .. } => facade,
        }
    }
}
