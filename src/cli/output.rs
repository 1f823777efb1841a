//! Output helpers shared by commands.

use serde::Serialize;

use crate::error::{BazaarError, Result};

/// Print `value` as pretty JSON on stdout.
pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| BazaarError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// Print `value` as one compact JSON line on stdout.
pub fn emit_json_line<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string(value)
        .map_err(|err| BazaarError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// JSON error body for `err`, the same shape `serve` answers with.
#[must_use]
pub fn error_body(err: &BazaarError) -> serde_json::Value {
    serde_json::json!({ "error": err.to_structured() })
}

pub fn emit_error(err: &BazaarError) {
    println!("{}", error_body(err));
}

/// Truncate to `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
