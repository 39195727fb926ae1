//! Field mappings: request property ↔ SQL column, with key metadata.

use serde_json::Value as JsonValue;

use crate::error::{GatewayError, Result};
use crate::ident::require_valid_identifier;

/// A declared correspondence between one request field and one SQL column.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub json_property: String,
    pub sql_column: String,
    pub required: bool,
    pub primary_key: bool,
    pub default_value: Option<JsonValue>,
}

impl FieldMapping {
    pub fn new(json_property: impl Into<String>, sql_column: impl Into<String>) -> Self {
        Self {
            json_property: json_property.into(),
            sql_column: sql_column.into(),
            required: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the mapping as part of the key set. Key fields are implicitly
    /// required for writes.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A validated, immutable set of field mappings for one table.
///
/// Invariants checked at construction: `json_property` values are unique
/// (case-insensitive) and every `sql_column` passes identifier validation.
#[derive(Debug, Clone)]
pub struct MappingSet {
    mappings: Vec<FieldMapping>,
}

impl MappingSet {
    pub fn new(mappings: Vec<FieldMapping>) -> Result<Self> {
        if mappings.is_empty() {
            return Err(GatewayError::configuration("empty field mapping set"));
        }
        let mut seen: Vec<String> = Vec::with_capacity(mappings.len());
        for m in &mappings {
            if m.json_property.is_empty() {
                return Err(GatewayError::configuration(
                    "field mapping with empty json property",
                ));
            }
            let lower = m.json_property.to_lowercase();
            if seen.contains(&lower) {
                return Err(GatewayError::Configuration(format!(
                    "duplicate field mapping for property: {}",
                    m.json_property
                )));
            }
            seen.push(lower);
            require_valid_identifier(&m.sql_column, false)?;
        }
        Ok(Self { mappings })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Mappings flagged `primary_key`, in declaration order.
    pub fn key_mappings(&self) -> Vec<&FieldMapping> {
        self.mappings.iter().filter(|m| m.primary_key).collect()
    }

    /// SQL columns of the key set, in declaration order.
    pub fn key_columns(&self) -> Vec<String> {
        self.key_mappings()
            .iter()
            .map(|m| m.sql_column.clone())
            .collect()
    }

    pub fn by_column(&self, sql_column: &str) -> Option<&FieldMapping> {
        self.mappings
            .iter()
            .find(|m| m.sql_column.eq_ignore_ascii_case(sql_column))
    }
}
