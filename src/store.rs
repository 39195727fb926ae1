//! Store client port.
//!
//! Raw SQL execution and connection management live outside this crate; the
//! engine only depends on this trait. Parameters are always passed by name —
//! the engine never interpolates request values into SQL text.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// One result row: ordered column name / value pairs. SQL NULL arrives as
/// `JsonValue::Null`.
pub type Row = Vec<(String, JsonValue)>;

/// Ordered named parameters bound to one statement.
pub type Params = [(String, JsonValue)];

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by the store client, split by scope: a statement
/// failure is attributable to the statement (and, in a batch, to one
/// record); a connection failure is fatal for the whole request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("statement failed: {0}")]
    Statement(#[source] anyhow::Error),

    #[error("connection failure: {0}")]
    Connection(#[source] anyhow::Error),
}

impl From<StoreError> for crate::error::GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Statement(e) => Self::Statement(e.to_string()),
            StoreError::Connection(e) => Self::Execution(e),
        }
    }
}

/// Interface to the external relational store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Run a row-returning statement.
    async fn query(&self, sql: &str, params: &Params) -> StoreResult<Vec<Row>>;

    /// Run a write statement, returning the affected-row count.
    async fn execute(&self, sql: &str, params: &Params) -> StoreResult<u64>;

    /// Ask the store to serialize the result set straight into wire JSON
    /// (an array of objects), bypassing per-row materialization here.
    async fn query_native(&self, sql: &str, params: &Params) -> StoreResult<String>;

    /// Bulk existence check: which of `encoded_keys` already exist in
    /// `table`, where each key encodes the `key_columns` tuple the way the
    /// batch engine encodes it. One round-trip regardless of key count.
    async fn probe_existing(
        &self,
        table: &str,
        key_columns: &[String],
        encoded_keys: &[String],
    ) -> StoreResult<HashSet<String>>;
}
