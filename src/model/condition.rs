//! Parameter conditions: "is this named field present?" → SQL fragment.

use serde_json::Value as JsonValue;

use crate::error::{GatewayError, Result};

/// One declarative WHERE-clause rule.
///
/// When the named request field is present, `sql_when_present` is appended
/// and, if `bind_value`, the field's value is bound under a parameter named
/// after the condition. When absent, `sql_when_absent` (if any) is appended
/// with no binding.
#[derive(Debug, Clone)]
pub struct ParameterCondition {
    pub name: String,
    pub sql_when_present: String,
    pub sql_when_absent: Option<String>,
    pub bind_value: bool,
    pub default_value: Option<JsonValue>,
}

impl ParameterCondition {
    /// A condition that binds the field's value when present.
    pub fn bound(name: impl Into<String>, sql_when_present: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_when_present: sql_when_present.into(),
            sql_when_absent: None,
            bind_value: true,
            default_value: None,
        }
    }

    /// A presence-only condition contributing SQL text without a binding.
    pub fn unbound(name: impl Into<String>, sql_when_present: impl Into<String>) -> Self {
        Self {
            bind_value: false,
            ..Self::bound(name, sql_when_present)
        }
    }

    pub fn when_absent(mut self, sql: impl Into<String>) -> Self {
        self.sql_when_absent = Some(sql.into());
        self
    }

    pub fn default_value(mut self, value: JsonValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Name of the bound parameter this condition contributes.
    pub fn parameter_name(&self) -> &str {
        &self.name
    }
}

/// Ordered collection of conditions, evaluated in declaration order.
///
/// Construction rejects duplicate condition names (case-insensitive): each
/// condition must contribute a uniquely named parameter.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: Vec<ParameterCondition>,
}

impl ConditionSet {
    pub fn new(conditions: Vec<ParameterCondition>) -> Result<Self> {
        let mut seen: Vec<String> = Vec::with_capacity(conditions.len());
        for cond in &conditions {
            if cond.name.is_empty() {
                return Err(GatewayError::configuration("condition with empty name"));
            }
            let lower = cond.name.to_lowercase();
            if seen.contains(&lower) {
                return Err(GatewayError::Configuration(format!(
                    "duplicate condition parameter name: {}",
                    cond.name
                )));
            }
            seen.push(lower);
        }
        Ok(Self { conditions })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterCondition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
