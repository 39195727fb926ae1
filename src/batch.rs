//! Batch upsert: one bulk existence check, then sequential per-record writes
//! with partial-success accounting.
//!
//! Records are processed strictly in input order. A failed record is
//! recorded with its original index and never aborts the batch; only a
//! store connection failure (not attributable to one record) escalates.

use std::collections::HashSet;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::error::{GatewayError, RecordFailure, Result};
use crate::props::PropertyCache;
use crate::spec::WriteSpec;
use crate::store::{StoreClient, StoreError};
use crate::write::{RecordWriter, WriteAction};
use crate::{COMPOSITE_KEY_DELIMITER, MAX_BATCH_SIZE};

/// Overall batch result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// Every record succeeded.
    Ok,
    /// Some records succeeded, some failed.
    Partial,
    /// The batch was rejected outright, or every record failed.
    Ko,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Partial => "PARTIAL",
            Self::Ko => "KO",
        }
    }
}

/// Aggregated outcome of one batch.
///
/// Invariant: `inserted + updated + errors` equals the number of records
/// processed, and `error_details.len() == errors` with indices in input
/// order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
    pub error_details: Vec<RecordFailure>,
    pub result_code: ResultCode,
    pub message: String,
}

impl BatchOutcome {
    fn rejected(message: String) -> Self {
        Self {
            inserted: 0,
            updated: 0,
            errors: 0,
            error_details: Vec::new(),
            result_code: ResultCode::Ko,
            message,
        }
    }
}

/// Encode a key tuple into a single collision-free string.
///
/// Each part is serialized as compact JSON, so strings stay quoted and the
/// string `"12"` never collides with the number `12`. Parts are joined with
/// a non-printable separator (ASCII unit separator) absent from ordinary
/// data — and JSON string escaping turns any embedded control character
/// into `` text, so the raw separator cannot appear inside a part
/// either. `("12","34")` and `("1","234")` encode differently, and the same
/// tuple always yields the same string.
pub fn encode_key(values: &[JsonValue]) -> String {
    let parts: Vec<String> = values.iter().map(JsonValue::to_string).collect();
    parts.join(&COMPOSITE_KEY_DELIMITER.to_string())
}

/// Run a whole batch against one write spec.
///
/// Returns `Err` only for fatal failures (store connection loss); every
/// record-scoped problem is folded into the outcome.
pub async fn process_batch(
    spec: &WriteSpec,
    store: &dyn StoreClient,
    cache: &PropertyCache,
    records: &[JsonValue],
) -> Result<BatchOutcome> {
    let total = records.len();
    if total > MAX_BATCH_SIZE {
        return Ok(BatchOutcome::rejected(format!(
            "Batch of {total} records exceeds maximum allowed size of {MAX_BATCH_SIZE}"
        )));
    }

    let writer = RecordWriter::new(spec, store, cache);
    let mut failures: Vec<RecordFailure> = Vec::new();

    // Key derivation. Records without a complete key are skipped with an
    // error; the batch goes on.
    let mut candidates: Vec<(usize, &JsonValue, Vec<(String, JsonValue)>, String)> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match writer.resolve_keys(record) {
            Ok(keys) => {
                let tuple: Vec<JsonValue> = keys.iter().map(|(_, v)| v.clone()).collect();
                let encoded = encode_key(&tuple);
                candidates.push((index, record, keys, encoded));
            }
            Err(e) => {
                failures.push(RecordFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    // One bulk probe for all candidate keys. A failure here is batch-level.
    let mut known: HashSet<String> = if candidates.is_empty() {
        HashSet::new()
    } else {
        let mut distinct: Vec<String> = Vec::new();
        for (_, _, _, encoded) in &candidates {
            if !distinct.contains(encoded) {
                distinct.push(encoded.clone());
            }
        }
        let key_columns = spec.key_columns();
        store
            .probe_existing(spec.table(), &key_columns, &distinct)
            .await
            .map_err(|e| match e {
                StoreError::Connection(inner) | StoreError::Statement(inner) => {
                    GatewayError::Execution(inner)
                }
            })?
    };

    let mut inserted = 0usize;
    let mut updated = 0usize;
    for (index, record, keys, encoded) in candidates {
        let exists = known.contains(&encoded);
        match writer.write_with_known_existence(record, &keys, exists).await {
            Ok(WriteAction::Inserted) => {
                inserted += 1;
                // Later occurrences of the same key in this batch update the
                // row we just wrote.
                known.insert(encoded);
            }
            Ok(WriteAction::Updated) => updated += 1,
            Err(e) if e.is_fatal() => {
                warn!(index, error = %e, "fatal store failure, aborting batch");
                return Err(e);
            }
            Err(e) => {
                debug!(index, error = %e, "record failed");
                failures.push(RecordFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    failures.sort_by_key(|f| f.index);
    let errors = failures.len();
    let result_code = if errors == 0 {
        ResultCode::Ok
    } else if errors == total {
        ResultCode::Ko
    } else {
        ResultCode::Partial
    };
    let message = format!(
        "Processed {total} records: {inserted} inserted, {updated} updated, {errors} errors"
    );
    Ok(BatchOutcome {
        inserted,
        updated,
        errors,
        error_details: failures,
        result_code,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_encoding_is_injective() {
        let a = encode_key(&[json!("12"), json!("34")]);
        let b = encode_key(&[json!("1"), json!("234")]);
        assert_ne!(a, b);
    }

    #[test]
    fn key_encoding_discriminates_value_types() {
        assert_ne!(encode_key(&[json!("12")]), encode_key(&[json!(12)]));
        assert_ne!(encode_key(&[json!("true")]), encode_key(&[json!(true)]));
        assert_ne!(encode_key(&[json!("null")]), encode_key(&[JsonValue::Null]));
    }

    #[test]
    fn delimiter_inside_a_string_part_cannot_collide() {
        // A string carrying the raw separator is escaped by JSON
        // serialization, so it cannot fake a two-part tuple.
        let smuggled = encode_key(&[json!("a\u{1F}b")]);
        let genuine = encode_key(&[json!("a"), json!("b")]);
        assert_ne!(smuggled, genuine);
    }

    #[test]
    fn key_encoding_is_deterministic() {
        let tuple = [json!(7), json!("west"), json!(true)];
        assert_eq!(encode_key(&tuple), encode_key(&tuple));
    }

    #[test]
    fn key_encoding_distinguishes_types_and_order() {
        assert_ne!(encode_key(&[json!(1), json!(2)]), encode_key(&[json!(2), json!(1)]));
        assert_ne!(
            encode_key(&[json!("a"), json!("b")]),
            encode_key(&[json!("ab")])
        );
    }

    #[test]
    fn parts_are_compact_json() {
        assert_eq!(encode_key(&[json!("alpha")]), "\"alpha\"");
        assert_eq!(encode_key(&[json!(42)]), "42");
        assert_eq!(
            encode_key(&[json!(1), json!("a")]),
            format!("1{}\"a\"", crate::COMPOSITE_KEY_DELIMITER)
        );
    }

    #[test]
    fn result_code_wire_names() {
        assert_eq!(ResultCode::Ok.as_str(), "OK");
        assert_eq!(ResultCode::Partial.as_str(), "PARTIAL");
        assert_eq!(ResultCode::Ko.as_str(), "KO");
    }

    #[test]
    fn rejected_outcome_shape() {
        let o = BatchOutcome::rejected("too big".into());
        assert_eq!(o.result_code, ResultCode::Ko);
        assert_eq!(o.inserted + o.updated + o.errors, 0);
        assert!(o.error_details.is_empty());
    }
}
