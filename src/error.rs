//! Error types for the NVMe frontend bridge
//!
//! Provides structured error types for request validation, registry lookups,
//! engine command dispatch, and the REST surface.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the bridge
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Registry inconsistent: {namespace} references missing subsystem {subsystem}")]
    RegistryInconsistent { namespace: String, subsystem: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Request validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid resource name {name}: {reason}")]
    InvalidResourceName { name: String, reason: String },

    #[error("Invalid resource ID {id}: {reason}")]
    InvalidResourceId { id: String, reason: String },

    #[error("Invalid update mask: {reason}")]
    InvalidUpdateMask { reason: String },

    #[error("Negative page size is not allowed: {0}")]
    InvalidPageSize(i32),

    #[error("Unknown or expired page token: {token}")]
    InvalidPageToken { token: String },

    // =========================================================================
    // Resource Errors
    // =========================================================================
    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Operation not implemented: {0}")]
    Unimplemented(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error("Engine rejected {command}: {reason}")]
    EngineRejected { command: String, reason: String },

    #[error("Engine transport failure on {command}: {reason}")]
    EngineTransport { command: String, reason: String },

    #[error("Engine call {command} timed out after {timeout:?}")]
    EngineTimeout { command: String, timeout: Duration },

    #[error("Engine state mismatch: {0}")]
    EngineMismatch(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Unimplemented,
    Internal,
    Unavailable,
    DeadlineExceeded,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Unimplemented => write!(f, "unimplemented"),
            ErrorKind::Internal => write!(f, "internal"),
            ErrorKind::Unavailable => write!(f, "unavailable"),
            ErrorKind::DeadlineExceeded => write!(f, "deadline_exceeded"),
        }
    }
}

impl Error {
    /// Classify this error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField { .. }
            | Error::Validation(_)
            | Error::InvalidResourceName { .. }
            | Error::InvalidResourceId { .. }
            | Error::InvalidUpdateMask { .. }
            | Error::InvalidPageSize(_)
            | Error::InvalidPageToken { .. } => ErrorKind::InvalidArgument,

            // Engine refusals surface as caller errors
            Error::EngineRejected { .. } | Error::EngineMismatch(_) => ErrorKind::InvalidArgument,

            Error::ResourceNotFound { .. } => ErrorKind::NotFound,

            Error::Unimplemented(_) => ErrorKind::Unimplemented,

            Error::EngineTransport { .. } => ErrorKind::Unavailable,
            Error::EngineTimeout { .. } => ErrorKind::DeadlineExceeded,

            Error::Internal(_)
            | Error::Configuration(_)
            | Error::RegistryInconsistent { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_)
            | Error::Metrics(_)
            | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::EngineTransport { .. } | Error::EngineTimeout { .. }
        )
    }

    /// Check if a caller may retry the request unchanged.
    ///
    /// The bridge itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    /// Shorthand for a missing subsystem
    pub fn subsystem_not_found(name: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            kind: "NvmeSubsystem".into(),
            name: name.into(),
        }
    }

    /// Shorthand for a missing namespace
    pub fn namespace_not_found(name: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            kind: "NvmeNamespace".into(),
            name: name.into(),
        }
    }
}

/// Result type alias for the bridge
pub type Result<T> = std::result::Result<T, Error>;
