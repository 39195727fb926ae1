//! Declarative JSON-to-SQL table gateway.
//!
//! Turns a parsed JSON request into a parameterized SQL statement, hands it
//! to an external store client, and shapes the result back into a JSON
//! envelope. Endpoint definitions — parameter conditions, field mappings,
//! key sets — are built once, fail fast on configuration errors, and are
//! shared immutably across concurrent requests.
//!
//! The heart of the crate:
//! - [`compile`] turns conditions and mappings into SQL text plus bound
//!   values (request values are never interpolated into SQL).
//! - [`write`] runs the existence-check → insert/update state machine for
//!   one record.
//! - [`batch`] upserts many records behind a single bulk existence check,
//!   with partial-success accounting.
//! - [`props`] provides the bounded, case-insensitive property lookup cache
//!   every component reads request fields through.
//!
//! Transport, authentication, raw SQL execution, and logging sinks are
//! external collaborators; the store is reached only through
//! [`store::StoreClient`].

pub mod batch;
pub mod compile;
pub mod envelope;
pub mod error;
pub mod ident;
pub mod model;
pub mod ops;
pub mod props;
pub mod read;
pub mod spec;
pub mod store;
pub mod write;

pub use batch::{encode_key, process_batch, BatchOutcome, ResultCode};
pub use compile::{compile_read, resolve_mappings, QueryPlan, ResolvedRecord, WhereTemplate};
pub use envelope::{BatchResponse, ReadResponse, WriteResponse};
pub use error::{GatewayError, RecordFailure, Result};
pub use ident::{is_valid_identifier, require_valid_identifier};
pub use model::{ConditionSet, FieldMapping, MappingSet, ParameterCondition};
pub use ops::{BatchWriteOperation, OpContext, Operation, ReadOperation, Response, WriteOperation};
pub use props::{CacheStats, PropertyCache};
pub use read::{ReadExecutor, ReadOutput};
pub use spec::{BatchWriteSpec, ReadMode, ReadSpec, WriteSpec};
pub use store::{Params, Row, StoreClient, StoreError, StoreResult};
pub use write::{RecordWriter, WriteAction};

/// Largest batch accepted by [`process_batch`]; larger batches are rejected
/// before any store call.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Longest accepted SQL identifier (table or column name).
pub const MAX_SQL_IDENTIFIER_LENGTH: usize = 128;

/// Property-cache entry bound; exceeding it clears the cache wholesale.
pub const MAX_CACHE_SIZE: usize = 1000;

/// Separator joining composite-key values. ASCII unit separator: absent
/// from ordinary data, so distinct tuples never encode to the same string.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{1F}';
