//! In-memory store client shared by the integration tests.
//!
//! Interprets exactly the statement shapes the gateway emits (existence
//! probe, INSERT .. VALUES, UPDATE .. SET .. WHERE, SELECT with bound or
//! literal equality conditions) against rows held in memory. Counts every
//! store call so tests can assert on round-trip behavior, and can inject
//! statement or connection failures.

#![allow(dead_code)] // not every test binary uses every helper

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use table_gateway::{encode_key, Params, Row, StoreClient, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    calls: AtomicUsize,
    fail_native: AtomicBool,
    drop_connection: AtomicBool,
    /// Any statement binding this value fails as a statement error.
    poison_value: Mutex<Option<JsonValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_native(&self) {
        self.fail_native.store(true, Ordering::SeqCst);
    }

    pub fn drop_connection(&self) {
        self.drop_connection.store(true, Ordering::SeqCst);
    }

    pub fn poison(&self, value: JsonValue) {
        *self.poison_value.lock().unwrap() = Some(value);
    }

    fn check_availability(&self) -> StoreResult<()> {
        if self.drop_connection.load(Ordering::SeqCst) {
            Err(StoreError::Connection(anyhow::anyhow!("connection lost")))
        } else {
            Ok(())
        }
    }

    fn check_poison(&self, params: &Params) -> StoreResult<()> {
        if let Some(poison) = self.poison_value.lock().unwrap().as_ref() {
            if params.iter().any(|(_, v)| v == poison) {
                return Err(StoreError::Statement(anyhow::anyhow!(
                    "constraint violation"
                )));
            }
        }
        Ok(())
    }

    fn select(&self, sql: &str, params: &Params) -> StoreResult<Vec<Row>> {
        let sql = sql.strip_suffix(" LIMIT 1").unwrap_or(sql);
        let from = sql
            .find(" FROM ")
            .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))?;
        let rest = &sql[from + 6..];
        let (table, conditions) = match rest.split_once(" WHERE ") {
            Some((t, w)) => (t.trim(), parse_conditions(w, params)?),
            None => (rest.trim(), Vec::new()),
        };
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(table).cloned().unwrap_or_default();
        let matched: Vec<Row> = rows
            .into_iter()
            .filter(|row| {
                conditions
                    .iter()
                    .all(|(col, want)| column_value(row, col) == Some(want))
            })
            .collect();
        if sql.starts_with("SELECT 1 ") {
            // Existence probe: one marker row per match is enough.
            return Ok(matched
                .iter()
                .map(|_| vec![("1".to_string(), JsonValue::from(1))])
                .collect());
        }
        Ok(matched)
    }
}

fn column_value<'a>(row: &'a Row, column: &str) -> Option<&'a JsonValue> {
    row.iter().find(|(c, _)| c == column).map(|(_, v)| v)
}

/// Parse `col = :param AND col2 = 7` into resolved column/value pairs.
fn parse_conditions(clause: &str, params: &Params) -> StoreResult<Vec<(String, JsonValue)>> {
    clause
        .split(" AND ")
        .map(|cond| {
            let (col, rhs) = cond
                .split_once('=')
                .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {cond}")))?;
            let col = col.trim().to_string();
            let rhs = rhs.trim();
            let value = if let Some(name) = rhs.strip_prefix(':') {
                params
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| {
                        StoreError::Statement(anyhow::anyhow!("unbound parameter: {name}"))
                    })?
            } else {
                serde_json::from_str(rhs)
                    .map_err(|e| StoreError::Statement(anyhow::anyhow!("bad literal {rhs}: {e}")))?
            };
            Ok((col, value))
        })
        .collect()
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn query(&self, sql: &str, params: &Params) -> StoreResult<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_availability()?;
        self.select(sql, params)
    }

    async fn execute(&self, sql: &str, params: &Params) -> StoreResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_availability()?;
        self.check_poison(params)?;

        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (table, rest) = rest
                .split_once(" (")
                .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))?;
            let (columns, _) = rest
                .split_once(')')
                .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))?;
            let row: Row = columns
                .split(", ")
                .map(|col| {
                    let value = params
                        .iter()
                        .find(|(n, _)| n == col)
                        .map(|(_, v)| v.clone())
                        .unwrap_or(JsonValue::Null);
                    (col.to_string(), value)
                })
                .collect();
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .push(row);
            return Ok(1);
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (table, rest) = rest
                .split_once(" SET ")
                .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))?;
            let (set_clause, where_clause) = rest
                .split_once(" WHERE ")
                .ok_or_else(|| StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))?;
            let sets = parse_conditions(&set_clause.replace(", ", " AND "), params)?;
            let conditions = parse_conditions(where_clause, params)?;
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table.to_string()).or_default();
            let mut affected = 0u64;
            for row in rows.iter_mut() {
                let matches = conditions
                    .iter()
                    .all(|(col, want)| column_value(row, col) == Some(want));
                if matches {
                    for (col, value) in &sets {
                        match row.iter_mut().find(|(c, _)| c == col) {
                            Some((_, slot)) => *slot = value.clone(),
                            None => row.push((col.clone(), value.clone())),
                        }
                    }
                    affected += 1;
                }
            }
            return Ok(affected);
        }

        Err(StoreError::Statement(anyhow::anyhow!("unsupported: {sql}")))
    }

    async fn query_native(&self, sql: &str, params: &Params) -> StoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_availability()?;
        if self.fail_native.load(Ordering::SeqCst) {
            return Err(StoreError::Statement(anyhow::anyhow!(
                "native serializer unavailable"
            )));
        }
        let rows = self.select(sql, params)?;
        let objects: Vec<JsonValue> = rows
            .into_iter()
            .map(|row| JsonValue::Object(row.into_iter().collect()))
            .collect();
        serde_json::to_string(&objects)
            .map_err(|e| StoreError::Statement(anyhow::anyhow!("serialize: {e}")))
    }

    async fn probe_existing(
        &self,
        table: &str,
        key_columns: &[String],
        encoded_keys: &[String],
    ) -> StoreResult<HashSet<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_availability()?;
        let candidates: HashSet<&String> = encoded_keys.iter().collect();
        let tables = self.tables.lock().unwrap();
        let mut existing = HashSet::new();
        for row in tables.get(table).map(Vec::as_slice).unwrap_or_default() {
            let tuple: Vec<JsonValue> = key_columns
                .iter()
                .map(|c| column_value(row, c).cloned().unwrap_or(JsonValue::Null))
                .collect();
            let encoded = encode_key(&tuple);
            if candidates.contains(&encoded) {
                existing.insert(encoded);
            }
        }
        Ok(existing)
    }
}
