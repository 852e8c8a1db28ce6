//! Identifier checks for everything that ends up on a command line or inside
//! the drop statement. Nothing is quoted or escaped downstream, so anything
//! that is not a plain identifier is rejected up front.

use crate::error::{ResetError, Result};
use regex::Regex;
use std::sync::OnceLock;

static CONTAINER_RE: OnceLock<Regex> = OnceLock::new();
static SQL_IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn container_re() -> &'static Regex {
    CONTAINER_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap())
}

fn sql_ident_re() -> &'static Regex {
    SQL_IDENT_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_$]+$").unwrap())
}

/// Container names follow the runtime's own naming rule.
pub fn validate_container(name: &str) -> Result<()> {
    if !container_re().is_match(name) {
        return Err(ResetError::InvalidIdentifier {
            kind: "container name",
            value: name.to_string(),
            rule: "must start with a letter or digit and contain only letters, digits, '_', '.', '-'",
        });
    }
    Ok(())
}

/// Unquoted MySQL identifier: database user, schema, or table name.
pub fn validate_sql_ident(kind: &'static str, value: &str) -> Result<()> {
    if value.len() > 64 || !sql_ident_re().is_match(value) {
        return Err(ResetError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            rule: "must be 1-64 characters of letters, digits, '_' or '$'",
        });
    }
    Ok(())
}

/// Table prefix may be empty; otherwise it obeys the identifier rule.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    validate_sql_ident("table prefix", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_containers() {
        for name in ["pkc_database_1", "pkc-mediawiki-1", "db.local", "x"] {
            validate_container(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_containers() {
        for name in ["", "-rm", "_db", "has space", "db;ls", "a/b"] {
            assert!(validate_container(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn valid_sql_idents() {
        for ident in ["wikiuser", "my_wiki", "witness_merkle_tree", "t$1", "0day"] {
            validate_sql_ident("table", ident).unwrap_or_else(|_| panic!("expected valid: {ident}"));
        }
    }

    #[test]
    fn invalid_sql_idents() {
        let too_long = "a".repeat(65);
        for ident in ["", "page-verification", "a,b", "t;DROP", "`t`", too_long.as_str()] {
            assert!(
                validate_sql_ident("table", ident).is_err(),
                "expected invalid: {ident}"
            );
        }
    }

    #[test]
    fn empty_prefix_is_allowed() {
        assert!(validate_prefix("").is_ok());
        assert!(validate_prefix("mw_").is_ok());
        assert!(validate_prefix("mw-").is_err());
    }

    #[test]
    fn error_names_the_offending_kind() {
        let err = validate_sql_ident("database user", "wiki user").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("database user"));
        assert!(msg.contains("'wiki user'"));
    }
}
