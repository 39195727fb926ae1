//! SQL identifier validation.
//!
//! Table and column names come from endpoint configuration, not from request
//! payloads (payload values are always bound as parameters), but they are
//! still validated before being spliced into SQL text. Validation runs at
//! definition build time only.

use crate::error::{GatewayError, Result};
use crate::MAX_SQL_IDENTIFIER_LENGTH;

/// Substrings rejected anywhere in an identifier, brackets included.
const FORBIDDEN: [&str; 6] = ["--", "/*", ";", "'", "\"", "`"];

/// Check whether `identifier` is a safe SQL identifier.
///
/// Accepts `name` or `schema.name` where each segment matches
/// `[A-Za-z_][A-Za-z0-9_]*`. With `allow_brackets`, each segment may be
/// wrapped in a single pair of square brackets (`[Order Details]` is still
/// rejected — bracketed segments follow the same character rules).
pub fn is_valid_identifier(identifier: &str, allow_brackets: bool) -> bool {
    if identifier.is_empty() || identifier.len() > MAX_SQL_IDENTIFIER_LENGTH {
        return false;
    }
    if FORBIDDEN.iter().any(|s| identifier.contains(s)) {
        return false;
    }
    let mut segments = identifier.split('.');
    let Some(first) = segments.next() else {
        return false;
    };
    if !valid_segment(first, allow_brackets) {
        return false;
    }
    match segments.next() {
        None => true,
        // One dot allowed, for schema.table.
        Some(second) => valid_segment(second, allow_brackets) && segments.next().is_none(),
    }
}

/// Strict variant: rejects with a `Security` error naming the offender.
pub fn require_valid_identifier(identifier: &str, allow_brackets: bool) -> Result<()> {
    if is_valid_identifier(identifier, allow_brackets) {
        Ok(())
    } else {
        Err(GatewayError::Security {
            identifier: identifier.to_string(),
        })
    }
}

fn valid_segment(segment: &str, allow_brackets: bool) -> bool {
    let inner = if allow_brackets && segment.starts_with('[') && segment.ends_with(']') {
        &segment[1..segment.len() - 1]
    } else {
        segment
    };
    if inner.is_empty() || inner.contains('[') || inner.contains(']') {
        return false;
    }
    let mut chars = inner.chars();
    let Some(head) = chars.next() else {
        return false;
    };
    if !(head.is_ascii_alphabetic() || head == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(is_valid_identifier("users", false));
        assert!(is_valid_identifier("_audit_log", false));
        assert!(is_valid_identifier("Order2", false));
    }

    #[test]
    fn accepts_schema_qualified() {
        assert!(is_valid_identifier("app.users", false));
        assert!(!is_valid_identifier("a.b.c", false));
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(!is_valid_identifier("Users; DROP TABLE Users--", false));
        assert!(!is_valid_identifier("users--", false));
        assert!(!is_valid_identifier("users/*x*/", false));
        assert!(!is_valid_identifier("users'", false));
        assert!(!is_valid_identifier("\"users\"", true));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(!is_valid_identifier("", false));
        assert!(!is_valid_identifier("1users", false));
        assert!(!is_valid_identifier("user name", false));
        assert!(!is_valid_identifier(".users", false));
        assert!(!is_valid_identifier("users.", false));
    }

    #[test]
    fn brackets_only_when_allowed() {
        assert!(is_valid_identifier("[users]", true));
        assert!(is_valid_identifier("[app].[users]", true));
        assert!(!is_valid_identifier("[users]", false));
        assert!(!is_valid_identifier("[[users]]", true));
        assert!(!is_valid_identifier("[]", true));
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_SQL_IDENTIFIER_LENGTH + 1);
        assert!(!is_valid_identifier(&long, false));
        let exact = "a".repeat(MAX_SQL_IDENTIFIER_LENGTH);
        assert!(is_valid_identifier(&exact, false));
    }

    #[test]
    fn strict_variant_errors() {
        assert!(require_valid_identifier("users", false).is_ok());
        let err = require_valid_identifier("Users; DROP TABLE Users--", false).unwrap_err();
        assert!(matches!(err, GatewayError::Security { .. }));
    }
}
