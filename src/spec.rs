//! Endpoint operation definitions.
//!
//! `ReadSpec`, `WriteSpec`, and `BatchWriteSpec` are built once per endpoint
//! via their builders and shared immutably across requests. Every
//! configuration invariant fails here — identifier validity, placeholder
//! arity, duplicate mappings, key-set presence — so a definition that
//! constructs successfully can never hit a configuration error at request
//! time.

use std::collections::HashSet;

use crate::compile::WhereTemplate;
use crate::error::{GatewayError, Result};
use crate::ident::require_valid_identifier;
use crate::model::{ConditionSet, FieldMapping, MappingSet, ParameterCondition};

/// How the read executor materializes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Build a column→value record per row in the engine.
    #[default]
    Structured,
    /// Ask the store to serialize rows straight to wire JSON; falls back to
    /// `Structured` on failure.
    Native,
}

/// Definition of one declarative read endpoint.
#[derive(Debug, Clone)]
pub struct ReadSpec {
    pub(crate) template: WhereTemplate,
    pub(crate) conditions: ConditionSet,
    pub(crate) default_where: Option<String>,
    pub(crate) mode: ReadMode,
    /// Lowercased column names stripped from structured output.
    pub(crate) exclude_fields: HashSet<String>,
    /// Echo the executed SQL in the response (debugging aid, off by default).
    pub(crate) include_sql: bool,
}

impl ReadSpec {
    pub fn builder(base_sql: impl Into<String>) -> ReadSpecBuilder {
        ReadSpecBuilder {
            base_sql: base_sql.into(),
            conditions: Vec::new(),
            default_where: None,
            mode: ReadMode::default(),
            exclude_fields: Vec::new(),
            include_sql: false,
        }
    }
}

#[derive(Debug)]
pub struct ReadSpecBuilder {
    base_sql: String,
    conditions: Vec<ParameterCondition>,
    default_where: Option<String>,
    mode: ReadMode,
    exclude_fields: Vec<String>,
    include_sql: bool,
}

impl ReadSpecBuilder {
    pub fn condition(mut self, condition: ParameterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn default_where(mut self, clause: impl Into<String>) -> Self {
        self.default_where = Some(clause.into());
        self
    }

    pub fn mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn exclude_field(mut self, field: impl Into<String>) -> Self {
        self.exclude_fields.push(field.into());
        self
    }

    pub fn include_sql(mut self) -> Self {
        self.include_sql = true;
        self
    }

    pub fn build(self) -> Result<ReadSpec> {
        let template = WhereTemplate::parse(self.base_sql)?;
        let conditions = ConditionSet::new(self.conditions)?;
        let exclude_fields: HashSet<String> = self
            .exclude_fields
            .iter()
            .map(|f| f.to_lowercase())
            .collect();
        if self.mode == ReadMode::Native && !exclude_fields.is_empty() {
            return Err(GatewayError::configuration(
                "native read mode cannot exclude fields",
            ));
        }
        Ok(ReadSpec {
            template,
            conditions,
            default_where: self.default_where,
            mode: self.mode,
            exclude_fields,
            include_sql: self.include_sql,
        })
    }
}

/// Definition of one single-record write endpoint (existence-checked upsert).
#[derive(Debug, Clone)]
pub struct WriteSpec {
    pub(crate) table: String,
    pub(crate) mappings: MappingSet,
    pub(crate) explicit_key_columns: Vec<String>,
    pub(crate) allow_updates: bool,
    pub(crate) existence_sql: Option<String>,
    pub(crate) insert_sql: Option<String>,
    pub(crate) update_sql: Option<String>,
}

impl WriteSpec {
    pub fn builder(table: impl Into<String>) -> WriteSpecBuilder {
        WriteSpecBuilder {
            table: table.into(),
            mappings: Vec::new(),
            explicit_key_columns: Vec::new(),
            allow_updates: true,
            existence_sql: None,
            insert_sql: None,
            update_sql: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    pub fn allow_updates(&self) -> bool {
        self.allow_updates
    }

    /// Key columns in declaration order: the explicit list when supplied,
    /// otherwise the mappings flagged `primary_key`.
    pub fn key_columns(&self) -> Vec<String> {
        if self.explicit_key_columns.is_empty() {
            self.mappings.key_columns()
        } else {
            self.explicit_key_columns.clone()
        }
    }

    /// Field mappings backing the key columns, in key-column order.
    pub fn key_mappings(&self) -> Vec<&FieldMapping> {
        self.key_columns()
            .iter()
            .filter_map(|c| self.mappings.by_column(c))
            .collect()
    }
}

#[derive(Debug)]
pub struct WriteSpecBuilder {
    table: String,
    mappings: Vec<FieldMapping>,
    explicit_key_columns: Vec<String>,
    allow_updates: bool,
    existence_sql: Option<String>,
    insert_sql: Option<String>,
    update_sql: Option<String>,
}

impl WriteSpecBuilder {
    pub fn mapping(mut self, mapping: FieldMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Supply the key columns explicitly instead of flagging mappings.
    pub fn key_column(mut self, column: impl Into<String>) -> Self {
        self.explicit_key_columns.push(column.into());
        self
    }

    pub fn allow_updates(mut self, allow: bool) -> Self {
        self.allow_updates = allow;
        self
    }

    /// Custom existence-probe SQL, used verbatim with key values bound.
    pub fn existence_sql(mut self, sql: impl Into<String>) -> Self {
        self.existence_sql = Some(sql.into());
        self
    }

    pub fn insert_sql(mut self, sql: impl Into<String>) -> Self {
        self.insert_sql = Some(sql.into());
        self
    }

    pub fn update_sql(mut self, sql: impl Into<String>) -> Self {
        self.update_sql = Some(sql.into());
        self
    }

    pub fn build(self) -> Result<WriteSpec> {
        require_valid_identifier(&self.table, true)?;
        let mappings = MappingSet::new(self.mappings)?;

        let flagged = mappings.key_columns();
        match (flagged.is_empty(), self.explicit_key_columns.is_empty()) {
            (true, true) => {
                return Err(GatewayError::configuration(
                    "no key set: flag mappings as primary keys or supply explicit key columns",
                ))
            }
            (false, false) => {
                return Err(GatewayError::configuration(
                    "both primary-key mappings and explicit key columns supplied; use exactly one",
                ))
            }
            _ => {}
        }
        for column in &self.explicit_key_columns {
            require_valid_identifier(column, false)?;
            if mappings.by_column(column).is_none() {
                return Err(GatewayError::Configuration(format!(
                    "explicit key column has no field mapping: {column}"
                )));
            }
        }
        for (label, sql) in [
            ("existence", &self.existence_sql),
            ("insert", &self.insert_sql),
            ("update", &self.update_sql),
        ] {
            if let Some(sql) = sql {
                if sql.trim().is_empty() {
                    return Err(GatewayError::Configuration(format!(
                        "custom {label} SQL is empty"
                    )));
                }
            }
        }
        Ok(WriteSpec {
            table: self.table,
            mappings,
            explicit_key_columns: self.explicit_key_columns,
            allow_updates: self.allow_updates,
            existence_sql: self.existence_sql,
            insert_sql: self.insert_sql,
            update_sql: self.update_sql,
        })
    }
}

/// Definition of one batch write endpoint: a write spec plus the name of the
/// array-valued request field carrying the records.
#[derive(Debug, Clone)]
pub struct BatchWriteSpec {
    pub(crate) write: WriteSpec,
    pub(crate) records_field: String,
}

impl BatchWriteSpec {
    pub fn new(write: WriteSpec, records_field: impl Into<String>) -> Self {
        Self {
            write,
            records_field: records_field.into(),
        }
    }

    pub fn write_spec(&self) -> &WriteSpec {
        &self.write
    }
}
