//! # Error Types
//!
//! Errors surfaced by the core subsystems. Field-level validation errors
//! carry the offending field so the UI can anchor the message next to it.

use crate::validation::ParamField;
use thiserror::Error;

/// A field-level or cross-field parameter validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// The field the error belongs to; None for cross-field rules.
    pub field: Option<ParamField>,
    /// Human-readable reason, shown beside the field.
    pub message: String,
}

impl ValidationError {
    /// A field-level error.
    #[must_use]
    pub fn field(field: ParamField, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            message: message.into(),
        }
    }

    /// A cross-field error.
    #[must_use]
    pub fn cross(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

/// Errors from the execution engine proper. VM-level failures (revert,
/// out of gas, ...) are not errors here: they come back as a `CallResult`
/// with `success = false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Parameters failed validation; the user edits and retries.
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ValidationError),

    /// The VM could not be used for this call.
    #[error("vm unavailable: {0}")]
    VmInit(String),
}

/// Errors from the persistence, fixture and config stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not parse.
    #[error("malformed json in {path}: {source}")]
    MalformedJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failure on write.
    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No home directory to resolve well-known paths against.
    #[error("home directory not found")]
    NoHomeDir,

    /// A persisted record could not be converted back to call parameters.
    #[error("bad persisted record: {0}")]
    BadRecord(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn malformed(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::MalformedJson {
            path: path.display().to_string(),
            source,
        }
    }
}
