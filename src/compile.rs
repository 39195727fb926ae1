//! Query plan compilation: WHERE templates, condition evaluation, and field
//! mapping resolution.
//!
//! Template arity is checked when the endpoint definition is built
//! (`WhereTemplate::parse`); per-request work is pure assembly — look values
//! up through the property cache, collect fragments, bind parameters.

use serde_json::Value as JsonValue;

use crate::error::{GatewayError, Result};
use crate::model::{ConditionSet, MappingSet};
use crate::props::PropertyCache;

/// A base SQL statement containing the `{WHERE}` placeholder exactly once.
#[derive(Debug, Clone)]
pub struct WhereTemplate {
    sql: String,
    /// Byte range of the placeholder within `sql`.
    placeholder: (usize, usize),
}

pub const WHERE_PLACEHOLDER: &str = "{where}";

impl WhereTemplate {
    /// Parse a template, requiring exactly one `{WHERE}` (any case).
    pub fn parse(sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        // ASCII lowering keeps byte offsets aligned with the original text.
        let lower = sql.to_ascii_lowercase();
        let mut matches = lower.match_indices(WHERE_PLACEHOLDER);
        let Some((start, _)) = matches.next() else {
            return Err(GatewayError::Configuration(format!(
                "template has no {{WHERE}} placeholder: {sql}"
            )));
        };
        if matches.next().is_some() {
            return Err(GatewayError::Configuration(format!(
                "template has more than one {{WHERE}} placeholder: {sql}"
            )));
        }
        let placeholder = (start, start + WHERE_PLACEHOLDER.len());
        Ok(Self { sql, placeholder })
    }

    /// Substitute the placeholder with `WHERE <clause>`, or remove it
    /// entirely when the clause is empty.
    pub fn render(&self, clause: &str) -> String {
        let (start, end) = self.placeholder;
        let prefix = self.sql[..start].trim_end();
        let suffix = self.sql[end..].trim_start();
        let mut out = String::with_capacity(self.sql.len() + clause.len() + 8);
        out.push_str(prefix);
        if !clause.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("WHERE ");
            out.push_str(clause);
        }
        if !suffix.is_empty() {
            out.push(' ');
            out.push_str(suffix);
        }
        out
    }
}

/// Compiled single statement: literal SQL plus ordered named parameters.
/// Transient — produced per request and handed straight to the store client.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub sql: String,
    pub parameters: Vec<(String, JsonValue)>,
}

/// Compile the read path: evaluate each condition against the request in
/// declaration order and assemble the final statement.
///
/// Returns the plan plus the names of the request fields that actually
/// contributed, for the `ProvidedParameters` echo.
pub fn compile_read(
    template: &WhereTemplate,
    conditions: &ConditionSet,
    default_where: Option<&str>,
    cache: &PropertyCache,
    request: &JsonValue,
) -> (QueryPlan, Vec<String>) {
    let mut fragments: Vec<&str> = Vec::new();
    let mut parameters: Vec<(String, JsonValue)> = Vec::new();
    let mut provided: Vec<String> = Vec::new();

    for cond in conditions.iter() {
        match cache.get(request, &cond.name) {
            Some(raw) => {
                fragments.push(&cond.sql_when_present);
                provided.push(cond.name.clone());
                if cond.bind_value {
                    let value = if raw.is_null() {
                        cond.default_value.clone().unwrap_or(JsonValue::Null)
                    } else {
                        raw
                    };
                    parameters.push((cond.parameter_name().to_string(), value));
                }
            }
            None => {
                if let Some(absent) = &cond.sql_when_absent {
                    fragments.push(absent);
                }
            }
        }
    }

    let clause = if fragments.is_empty() {
        default_where.unwrap_or("").to_string()
    } else {
        fragments.join(" AND ")
    };

    let plan = QueryPlan {
        sql: template.render(&clause),
        parameters,
    };
    (plan, provided)
}

/// Outcome of resolving a mapping set against one request object.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRecord {
    /// Resolved column/value pairs in mapping declaration order.
    pub values: Vec<(String, JsonValue)>,
    /// Every required property absent from the request, not just the first.
    pub missing_required: Vec<String>,
}

impl ResolvedRecord {
    pub fn value_of(&self, sql_column: &str) -> Option<&JsonValue> {
        self.values
            .iter()
            .find(|(c, _)| c == sql_column)
            .map(|(_, v)| v)
    }
}

/// Resolve every mapping against the request via the property cache.
///
/// Absent + required → listed in `missing_required`; absent with a default →
/// the default; absent otherwise → column omitted from the statement;
/// present → the raw value (including JSON null).
pub fn resolve_mappings(
    mappings: &MappingSet,
    cache: &PropertyCache,
    request: &JsonValue,
) -> ResolvedRecord {
    let mut resolved = ResolvedRecord::default();
    for mapping in mappings.iter() {
        match cache.get(request, &mapping.json_property) {
            Some(value) => resolved.values.push((mapping.sql_column.clone(), value)),
            None => {
                if mapping.required {
                    resolved.missing_required.push(mapping.json_property.clone());
                } else if let Some(default) = &mapping.default_value {
                    resolved
                        .values
                        .push((mapping.sql_column.clone(), default.clone()));
                }
            }
        }
    }
    resolved
}
