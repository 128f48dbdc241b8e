//! Error types for the project service layer
//!
//! Structured errors built with thiserror. Only failures that make a
//! project container impossible to build surface here; config syntax
//! problems and probe misses are recovered where they happen.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::project_resolver::ProjectKey;

/// Errors raised while building or driving a project container
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The project config (or a config it depends on) could not be loaded
    #[error("Failed to load project config: {0}")]
    Config(#[from] ConfigError),

    /// The background construction task panicked or was cancelled by the runtime
    #[error("Construction of project {key} was aborted: {reason}")]
    ConstructionAborted { key: ProjectKey, reason: String },

    /// The registry was shut down
    #[error("Service registry has been shut down")]
    RegistryClosed,
}

impl ServiceError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::Config(_) => "PROJECT_CONFIG_ERROR",
            Self::ConstructionAborted { .. } => "CONSTRUCTION_ABORTED",
            Self::RegistryClosed => "REGISTRY_CLOSED",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(_) => vec![
                "Check that the tsconfig.json and every referenced project config exist",
                "Verify read permissions on the config files",
                "With registry.retry_failed = false the service must be restarted after a fix",
            ],
            Self::ConstructionAborted { .. } => vec!["Retry the request"],
            Self::RegistryClosed => vec![],
        }
    }
}

/// Errors specific to config loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load referenced project '{path}' (from '{from}'): {source}")]
    Reference {
        path: PathBuf,
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result shared by every caller awaiting the same project construction
pub type SharedResult<T> = Result<T, Arc<ServiceError>>;

/// Result type alias for config loading
pub type ConfigResult<T> = Result<T, ConfigError>;
