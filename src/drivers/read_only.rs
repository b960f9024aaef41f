//! Statement guard for read-only connections.

use crate::error::{ConnectorError, Result};

/// Leading keywords rejected on a read-only connection.
pub const BLOCKED_KEYWORDS: [&str; 5] = ["insert", "update", "delete", "drop", "alter"];

/// The leading keyword of a statement, lowercased, if it is a blocked one.
fn blocked_keyword(sql: &str) -> Option<&'static str> {
    let head: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_KEYWORDS.iter().copied().find(|kw| head == *kw)
}

/// Reject destructive statements when `read_only` is set.
///
/// Runs before any engine contact, so a rejected statement never reaches the
/// pool (and is rejected even on a disconnected instance).
pub fn guard_statement(name: &str, read_only: bool, sql: &str) -> Result<()> {
    if !read_only {
        return Ok(());
    }
    match blocked_keyword(sql) {
        Some(keyword) => {
            tracing::debug!(connection = %name, keyword, "rejected statement on read-only connection");
            Err(ConnectorError::PermissionDenied {
                name: name.to_string(),
                keyword: keyword.to_ascii_uppercase(),
            })
        }
        None => Ok(()),
    }
}
