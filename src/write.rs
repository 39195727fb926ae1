//! Single-record writer: existence check → insert or update.
//!
//! The state machine is CheckExistence → (Insert | Update) → Done, with a
//! terminal error exit from any state. Exactly one probe and one write
//! statement reach the store per call; in a batch the probe is skipped
//! because the bulk existence check already supplied the answer
//! (`write_with_known_existence`).

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::compile::resolve_mappings;
use crate::error::{GatewayError, Result};
use crate::props::PropertyCache;
use crate::spec::WriteSpec;
use crate::store::StoreClient;

/// Which branch of the state machine completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Inserted,
    Updated,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "INSERTED",
            Self::Updated => "UPDATED",
        }
    }
}

/// Executes one upsert against one table, per the write spec.
pub struct RecordWriter<'a> {
    spec: &'a WriteSpec,
    store: &'a dyn StoreClient,
    cache: &'a PropertyCache,
}

impl<'a> RecordWriter<'a> {
    pub fn new(spec: &'a WriteSpec, store: &'a dyn StoreClient, cache: &'a PropertyCache) -> Self {
        Self { spec, store, cache }
    }

    /// Full state machine: probe existence, then insert or update.
    pub async fn upsert(&self, request: &JsonValue) -> Result<WriteAction> {
        let keys = self.resolve_keys(request)?;
        let exists = self.probe(&keys).await?;
        self.write_with_known_existence(request, &keys, exists).await
    }

    /// Resolve the key tuple from the request. Every key field must be
    /// present and non-null; all missing fields are reported together,
    /// before any SQL executes.
    pub fn resolve_keys(&self, request: &JsonValue) -> Result<Vec<(String, JsonValue)>> {
        let mut keys = Vec::new();
        let mut missing = Vec::new();
        for mapping in self.spec.key_mappings() {
            match self.cache.get(request, &mapping.json_property) {
                Some(value) if !value.is_null() => {
                    keys.push((mapping.sql_column.clone(), value));
                }
                // Null cannot identify a record; treat it as missing.
                _ => missing.push(mapping.json_property.clone()),
            }
        }
        if missing.is_empty() {
            Ok(keys)
        } else {
            Err(GatewayError::Validation(format!(
                "missing required key field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// CheckExistence state: one probe against the key columns only.
    async fn probe(&self, keys: &[(String, JsonValue)]) -> Result<bool> {
        let sql = match &self.spec.existence_sql {
            Some(custom) => custom.clone(),
            None => {
                let clause = keys
                    .iter()
                    .map(|(c, _)| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!("SELECT 1 FROM {} WHERE {clause} LIMIT 1", self.spec.table())
            }
        };
        debug!(table = %self.spec.table(), "existence probe");
        let rows = self.store.query(&sql, keys).await?;
        Ok(!rows.is_empty())
    }

    /// Insert or Update with the existence answer already known.
    pub async fn write_with_known_existence(
        &self,
        request: &JsonValue,
        keys: &[(String, JsonValue)],
        exists: bool,
    ) -> Result<WriteAction> {
        let resolved = resolve_mappings(self.spec.mappings(), self.cache, request);
        if !resolved.missing_required.is_empty() {
            return Err(GatewayError::Validation(format!(
                "missing required field(s): {}",
                resolved.missing_required.join(", ")
            )));
        }

        if exists {
            if !self.spec.allow_updates() {
                return Err(GatewayError::validation(
                    "record already exists, updates not allowed",
                ));
            }
            self.update(&resolved.values, keys).await
        } else {
            self.insert(&resolved.values).await
        }
    }

    async fn insert(&self, values: &[(String, JsonValue)]) -> Result<WriteAction> {
        let sql = match &self.spec.insert_sql {
            Some(custom) => custom.clone(),
            None => {
                let columns = values
                    .iter()
                    .map(|(c, _)| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = values
                    .iter()
                    .map(|(c, _)| format!(":{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                    self.spec.table()
                )
            }
        };
        debug!(table = %self.spec.table(), columns = values.len(), "insert");
        self.store.execute(&sql, values).await?;
        Ok(WriteAction::Inserted)
    }

    async fn update(
        &self,
        values: &[(String, JsonValue)],
        keys: &[(String, JsonValue)],
    ) -> Result<WriteAction> {
        let key_columns = self.spec.key_columns();
        let set_values: Vec<(String, JsonValue)> = values
            .iter()
            .filter(|(c, _)| !key_columns.iter().any(|k| k.eq_ignore_ascii_case(c)))
            .cloned()
            .collect();

        let sql = match &self.spec.update_sql {
            Some(custom) => custom.clone(),
            None => {
                if set_values.is_empty() {
                    return Err(GatewayError::validation(
                        "no non-key columns to update",
                    ));
                }
                let set_clause = set_values
                    .iter()
                    .map(|(c, _)| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let where_clause = keys
                    .iter()
                    .map(|(c, _)| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!(
                    "UPDATE {} SET {set_clause} WHERE {where_clause}",
                    self.spec.table()
                )
            }
        };

        let mut params = set_values;
        params.extend(keys.iter().cloned());
        debug!(table = %self.spec.table(), "update");
        self.store.execute(&sql, &params).await?;
        Ok(WriteAction::Updated)
    }
}
