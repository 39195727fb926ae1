//! Response envelopes returned to the surrounding request pipeline.
//!
//! Wire field names are PascalCase. Validation and record errors surface as
//! structured KO envelopes; store internals never leak into `Reason`.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::batch::BatchOutcome;
use crate::error::RecordFailure;
use crate::write::WriteAction;

/// Envelope for read endpoints.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReadResponse {
    Ok {
        #[serde(rename = "Result")]
        result: &'static str,
        #[serde(rename = "ProvidedParameters")]
        provided_parameters: String,
        #[serde(rename = "ExecutedSQL", skip_serializing_if = "Option::is_none")]
        executed_sql: Option<String>,
        #[serde(rename = "Records")]
        records: Vec<JsonValue>,
        #[serde(rename = "Fallback", skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    Ko {
        #[serde(rename = "Result")]
        result: &'static str,
        #[serde(rename = "Reason")]
        reason: String,
    },
}

impl ReadResponse {
    pub fn ok(
        provided_parameters: Vec<String>,
        executed_sql: Option<String>,
        records: Vec<JsonValue>,
        fallback: Option<String>,
    ) -> Self {
        Self::Ok {
            result: "OK",
            provided_parameters: provided_parameters.join(", "),
            executed_sql,
            records,
            fallback,
        }
    }

    pub fn ko(reason: impl Into<String>) -> Self {
        Self::Ko {
            result: "KO",
            reason: reason.into(),
        }
    }
}

/// Envelope for single-record write endpoints.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WriteResponse {
    Ok {
        #[serde(rename = "Result")]
        result: &'static str,
        #[serde(rename = "Action")]
        action: &'static str,
        #[serde(rename = "Message")]
        message: String,
    },
    Ko {
        #[serde(rename = "Result")]
        result: &'static str,
        #[serde(rename = "Reason")]
        reason: String,
    },
}

impl WriteResponse {
    pub fn ok(action: WriteAction, message: impl Into<String>) -> Self {
        Self::Ok {
            result: "OK",
            action: action.as_str(),
            message: message.into(),
        }
    }

    pub fn ko(reason: impl Into<String>) -> Self {
        Self::Ko {
            result: "KO",
            reason: reason.into(),
        }
    }
}

/// Envelope for batch write endpoints.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    #[serde(rename = "Result")]
    pub result: &'static str,
    #[serde(rename = "Inserted")]
    pub inserted: usize,
    #[serde(rename = "Updated")]
    pub updated: usize,
    #[serde(rename = "Errors")]
    pub errors: usize,
    #[serde(rename = "ErrorDetails")]
    pub error_details: Vec<RecordFailure>,
    #[serde(rename = "Message")]
    pub message: String,
}

impl From<BatchOutcome> for BatchResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            result: outcome.result_code.as_str(),
            inserted: outcome.inserted,
            updated: outcome.updated,
            errors: outcome.errors,
            error_details: outcome.error_details,
            message: outcome.message,
        }
    }
}

impl BatchResponse {
    /// Batch-level rejection (fatal failure or malformed payload).
    pub fn ko(message: impl Into<String>) -> Self {
        Self {
            result: "KO",
            inserted: 0,
            updated: 0,
            errors: 0,
            error_details: Vec::new(),
            message: message.into(),
        }
    }
}
