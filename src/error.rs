//! Gateway error taxonomy.
//!
//! Two channels: configuration problems fail endpoint construction with a
//! distinguishable variant so a misconfigured endpoint can never run, while
//! per-record problems inside a batch are plain values (`RecordFailure`)
//! collected into the batch outcome, never thrown across the batch loop.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid endpoint definition — raised at build time, never per request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A table or column name failed SQL-identifier validation.
    #[error("security error: invalid SQL identifier {identifier:?}")]
    Security { identifier: String },

    /// A request failed validation (missing fields, oversized batch, bad payload).
    #[error("validation error: {0}")]
    Validation(String),

    /// A single statement failed at the store (constraint violation and the
    /// like). Recoverable: inside a batch it becomes that record's error.
    #[error("statement error: {0}")]
    Statement(String),

    /// Store-level failure not attributable to a single record.
    #[error("execution error: {0}")]
    Execution(#[source] anyhow::Error),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors that abort an entire request rather than one record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Internal(_))
    }
}

/// One failed record inside a batch, reported in original input order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecordFailure {
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "Message")]
    pub message: String,
}

impl std::fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}: {}", self.index, self.message)
    }
}
