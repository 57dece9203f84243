//! Error conventions for MCP servers
//!
//! Tools in this workspace report operational failures as ordinary text
//! (`Error: {message}`) so the calling agent can read them. Protocol-level
//! errors are reserved for malformed requests.

use std::fmt::Display;

/// Render a failure as tool output text
///
/// # Example
///
/// ```rust,ignore
/// use mcp_common::{error_text, text_success};
///
/// let text = match run_query().await {
///     Ok(rendered) => rendered,
///     Err(e) => error_text(&e),
/// };
/// Ok(text_success(text))
/// ```
pub fn error_text(err: impl Display) -> String {
    format!("Error: {}", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_prefix() {
        assert_eq!(error_text("no such table: users"), "Error: no such table: users");
    }

    #[test]
    fn test_error_text_from_error_type() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.db");
        assert_eq!(error_text(&err), "Error: missing.db");
    }
}
