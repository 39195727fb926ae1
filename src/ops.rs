//! Closed operation set dispatched by the request router.
//!
//! Each endpoint definition becomes exactly one of `ReadOperation`,
//! `WriteOperation`, or `BatchWriteOperation`; the router selects a variant
//! rather than invoking an opaque callable. Operations receive their
//! collaborators through `OpContext` — no ambient global state.
//!
//! Request-level problems come back as structured KO envelopes. Store
//! internals are logged here and replaced with a generic reason before
//! anything reaches the caller.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::batch::process_batch;
use crate::compile::compile_read;
use crate::envelope::{BatchResponse, ReadResponse, WriteResponse};
use crate::error::GatewayError;
use crate::props::PropertyCache;
use crate::read::ReadExecutor;
use crate::spec::{BatchWriteSpec, ReadSpec, WriteSpec};
use crate::store::StoreClient;
use crate::write::{RecordWriter, WriteAction};

/// Injected collaborators shared by every operation.
#[derive(Clone)]
pub struct OpContext {
    pub store: Arc<dyn StoreClient>,
    pub cache: Arc<PropertyCache>,
}

impl OpContext {
    pub fn new(store: Arc<dyn StoreClient>, cache: Arc<PropertyCache>) -> Self {
        Self { store, cache }
    }
}

/// Reason safe to return to the caller. Validation messages pass through;
/// store failures are replaced with a generic line.
fn public_reason(err: &GatewayError) -> String {
    match err {
        GatewayError::Validation(msg) => msg.clone(),
        GatewayError::Configuration(_) | GatewayError::Security { .. } => err.to_string(),
        GatewayError::Statement(_) | GatewayError::Execution(_) | GatewayError::Internal(_) => {
            "internal execution error".to_string()
        }
    }
}

// ── Read ──────────────────────────────────────────────────────

pub struct ReadOperation {
    spec: ReadSpec,
}

impl ReadOperation {
    pub fn new(spec: ReadSpec) -> Self {
        Self { spec }
    }

    pub async fn execute(&self, ctx: &OpContext, request: &JsonValue) -> ReadResponse {
        let (plan, provided) = compile_read(
            &self.spec.template,
            &self.spec.conditions,
            self.spec.default_where.as_deref(),
            &ctx.cache,
            request,
        );
        let executor = ReadExecutor::new(ctx.store.as_ref());
        match executor
            .execute(&plan, self.spec.mode, &self.spec.exclude_fields)
            .await
        {
            Ok(output) => ReadResponse::ok(
                provided,
                self.spec.include_sql.then(|| plan.sql.clone()),
                output.records,
                output.fallback,
            ),
            Err(e) => {
                warn!(error = %e, sql = %plan.sql, "read failed");
                ReadResponse::ko(public_reason(&e))
            }
        }
    }
}

// ── Write ─────────────────────────────────────────────────────

pub struct WriteOperation {
    spec: WriteSpec,
}

impl WriteOperation {
    pub fn new(spec: WriteSpec) -> Self {
        Self { spec }
    }

    pub async fn execute(&self, ctx: &OpContext, request: &JsonValue) -> WriteResponse {
        let writer = RecordWriter::new(&self.spec, ctx.store.as_ref(), &ctx.cache);
        match writer.upsert(request).await {
            Ok(action) => {
                let verb = match action {
                    WriteAction::Inserted => "inserted into",
                    WriteAction::Updated => "updated in",
                };
                WriteResponse::ok(action, format!("Record {verb} {}", self.spec.table()))
            }
            Err(e) => {
                warn!(error = %e, table = %self.spec.table(), "write failed");
                WriteResponse::ko(public_reason(&e))
            }
        }
    }
}

// ── Batch write ───────────────────────────────────────────────

pub struct BatchWriteOperation {
    spec: BatchWriteSpec,
}

impl BatchWriteOperation {
    pub fn new(spec: BatchWriteSpec) -> Self {
        Self { spec }
    }

    pub async fn execute(&self, ctx: &OpContext, request: &JsonValue) -> BatchResponse {
        let records = match ctx.cache.get(request, &self.spec.records_field) {
            Some(JsonValue::Array(records)) => records,
            Some(_) => {
                return BatchResponse::ko(format!(
                    "field {} is not an array of records",
                    self.spec.records_field
                ))
            }
            None => {
                return BatchResponse::ko(format!(
                    "missing batch field: {}",
                    self.spec.records_field
                ))
            }
        };
        match process_batch(&self.spec.write, ctx.store.as_ref(), &ctx.cache, &records).await {
            Ok(outcome) => BatchResponse::from(outcome),
            Err(e) => {
                error!(error = %e, table = %self.spec.write.table(), "batch aborted");
                BatchResponse::ko("internal execution error")
            }
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────

/// The router holds one of these per endpoint.
pub enum Operation {
    Read(ReadOperation),
    Write(WriteOperation),
    BatchWrite(BatchWriteOperation),
}

/// Envelope union matching the operation that produced it.
#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum Response {
    Read(ReadResponse),
    Write(WriteResponse),
    Batch(BatchResponse),
}

impl Operation {
    pub async fn execute(&self, ctx: &OpContext, request: &JsonValue) -> Response {
        match self {
            Self::Read(op) => Response::Read(op.execute(ctx, request).await),
            Self::Write(op) => Response::Write(op.execute(ctx, request).await),
            Self::BatchWrite(op) => Response::Batch(op.execute(ctx, request).await),
        }
    }
}
