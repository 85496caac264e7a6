//! Error types for Model Hub

use crate::types::Readiness;

/// Result type alias using Model Hub's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Model Hub operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backend with this key is already registered
    #[error("model key '{key}' is already registered")]
    DuplicateKey { key: String },

    /// No backend is registered under this key
    #[error("model '{key}' not found")]
    UnknownKey { key: String },

    /// The backend cannot serve predictions in its current state
    #[error("model '{key}' is not ready ({readiness})")]
    NotReady { key: String, readiness: Readiness },

    /// Loading the underlying inference capability failed
    #[error("failed to initialize model '{key}': {message}")]
    Init { key: String, message: String },

    /// The inference capability failed while serving a request
    #[error("prediction failed for model '{key}': {message}")]
    Predict { key: String, message: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Coarse classification of an error for the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller named something that does not exist
    NotFound,
    /// The target exists but cannot serve yet
    Unavailable,
    /// Startup wiring or configuration is invalid
    Config,
    /// Anything else; detail must stay server-side
    Internal,
}

impl Error {
    /// Create a new initialization error
    pub fn init(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Init {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a new prediction error
    pub fn predict(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Predict {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a new not-ready error
    pub fn not_ready(key: impl Into<String>, readiness: Readiness) -> Self {
        Self::NotReady {
            key: key.into(),
            readiness,
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error for the request boundary
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownKey { .. } => ErrorClass::NotFound,
            Self::NotReady { .. } => ErrorClass::Unavailable,
            Self::DuplicateKey { .. } | Self::Config(_) | Self::Yaml(_) => ErrorClass::Config,
            Self::Init { .. } | Self::Predict { .. } | Self::Io(_) | Self::Serialization(_) => {
                ErrorClass::Internal
            }
        }
    }
}
