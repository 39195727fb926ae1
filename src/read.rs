//! Read executor: structured row materialization or native store-side
//! serialization, with transparent fallback.

use std::collections::HashSet;

use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::compile::QueryPlan;
use crate::error::{GatewayError, Result};
use crate::spec::ReadMode;
use crate::store::{StoreClient, StoreError};

/// Rows produced by one read, plus the fallback reason when native
/// serialization was requested but structured materialization served the
/// request instead.
#[derive(Debug, Clone)]
pub struct ReadOutput {
    pub records: Vec<JsonValue>,
    pub fallback: Option<String>,
}

pub struct ReadExecutor<'a> {
    store: &'a dyn StoreClient,
}

impl<'a> ReadExecutor<'a> {
    pub fn new(store: &'a dyn StoreClient) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        plan: &QueryPlan,
        mode: ReadMode,
        exclude_fields: &HashSet<String>,
    ) -> Result<ReadOutput> {
        match mode {
            ReadMode::Structured => Ok(ReadOutput {
                records: self.structured(plan, exclude_fields).await?,
                fallback: None,
            }),
            ReadMode::Native => match self.native(plan).await {
                Ok(records) => Ok(ReadOutput {
                    records,
                    fallback: None,
                }),
                // A dead connection would doom the structured retry too.
                Err(NativeFailure::Fatal(err)) => Err(err),
                Err(NativeFailure::Fallback(reason)) => {
                    warn!(%reason, "native serialization failed, falling back to structured");
                    Ok(ReadOutput {
                        records: self.structured(plan, exclude_fields).await?,
                        fallback: Some(reason),
                    })
                }
            },
        }
    }

    /// Materialize each row as a column→value object, skipping excluded
    /// columns via constant-time set membership. SQL NULL maps to JSON null.
    async fn structured(
        &self,
        plan: &QueryPlan,
        exclude_fields: &HashSet<String>,
    ) -> Result<Vec<JsonValue>> {
        let rows = self.store.query(&plan.sql, &plan.parameters).await?;
        let records = rows
            .into_iter()
            .map(|row| {
                let mut object = Map::with_capacity(row.len());
                for (column, value) in row {
                    if !exclude_fields.contains(&column.to_lowercase()) {
                        object.insert(column, value);
                    }
                }
                JsonValue::Object(object)
            })
            .collect();
        Ok(records)
    }

    /// Store-side serialization. Statement-scoped store errors, unparsable
    /// payloads, and non-array shapes come back as fallback reasons so the
    /// caller can retry structured; a connection failure is fatal either
    /// way and is not fallback-eligible.
    async fn native(&self, plan: &QueryPlan) -> std::result::Result<Vec<JsonValue>, NativeFailure> {
        let wire = match self.store.query_native(&plan.sql, &plan.parameters).await {
            Ok(wire) => wire,
            Err(err @ StoreError::Connection(_)) => {
                return Err(NativeFailure::Fatal(err.into()))
            }
            Err(err) => return Err(NativeFailure::Fallback(err.to_string())),
        };
        let parsed: JsonValue = serde_json::from_str(&wire)
            .map_err(|e| NativeFailure::Fallback(format!("invalid native payload: {e}")))?;
        match parsed {
            JsonValue::Array(records) => Ok(records),
            other => Err(NativeFailure::Fallback(format!(
                "native payload is not a rowset array (got {})",
                type_name(&other)
            ))),
        }
    }
}

/// Why native serialization did not produce rows.
enum NativeFailure {
    /// Request-fatal; retrying structured cannot succeed.
    Fatal(GatewayError),
    /// Worth one structured retry, with the reason echoed to the caller.
    Fallback(String),
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
