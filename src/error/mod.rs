//! Error handling for bazaar.
//!
//! This module provides:
//! - [`BazaarError`]: The main error enum for all operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error body with suggestion, recovery hint and context

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::{ErrorCode, Recovery};

/// Main error type for bazaar operations.
#[derive(Error, Debug)]
pub enum BazaarError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid value for filter '{role}': {reason}")]
    InvalidFilterShape { role: String, reason: String },

    #[error("Unknown filter role: {0}")]
    UnknownFilterRole(String),

    #[error("Cursor not found: {0}")]
    CursorNotFound(String),

    #[error("Cursor expired: {0}")]
    CursorExpired(String),

    #[error("Search session not found: {0}")]
    SessionNotFound(String),

    #[error("Search session expired: {0}")]
    SessionExpired(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Search timed out after {0} ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl BazaarError {
    /// Get the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) | Self::Migration(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) | Self::Serialization(_) => ErrorCode::SerializationError,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::InvalidFilterShape { .. } => ErrorCode::InvalidFilterShape,
            Self::UnknownFilterRole(_) => ErrorCode::UnknownFilterRole,
            Self::CursorNotFound(_) => ErrorCode::CursorNotFound,
            Self::CursorExpired(_) => ErrorCode::CursorExpired,
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::SessionExpired(_) => ErrorCode::SessionExpired,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::Cancelled => ErrorCode::SearchCancelled,
            Self::Timeout(_) => ErrorCode::SearchTimeout,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::InvalidFilterShape { role, reason } => {
                Some(serde_json::json!({ "role": role, "reason": reason }))
            }
            Self::UnknownFilterRole(role) => Some(serde_json::json!({ "role": role })),
            Self::CursorNotFound(token) | Self::CursorExpired(token) => {
                Some(serde_json::json!({ "cursor": token }))
            }
            Self::SessionNotFound(token) | Self::SessionExpired(token) => {
                Some(serde_json::json!({ "qid": token }))
            }
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            Self::Timeout(ms) => Some(serde_json::json!({ "timeout_ms": ms })),
            _ => None,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_bazaar_error(self)
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// This is the error body returned to search clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "CURSOR_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 201)
    pub numeric_code: u16,

    /// HTTP-equivalent status
    pub status: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// What the client should do next
    pub recovery: Recovery,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Error category (e.g., "request", "pagination", "storage")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            status: code.http_status(),
            suggestion: code.suggestion().to_string(),
            recovery: code.recovery(),
            context: None,
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a `BazaarError`.
    #[must_use]
    pub fn from_bazaar_error(err: &BazaarError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = match (&code, context.as_ref().and_then(|c| c.get("role"))) {
            (ErrorCode::InvalidFilterShape, Some(role)) => {
                format!("Fix the value of filter {role}. {}", code.suggestion())
            }
            _ => code.suggestion().to_string(),
        };

        Self {
            code,
            numeric_code: code.numeric(),
            status: code.http_status(),
            message: err.to_string(),
            suggestion,
            recovery: code.recovery(),
            context,
            category: code.category().to_string(),
        }
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<BazaarError> for StructuredError {
    fn from(err: BazaarError) -> Self {
        Self::from_bazaar_error(&err)
    }
}

impl From<&BazaarError> for StructuredError {
    fn from(err: &BazaarError) -> Self {
        Self::from_bazaar_error(err)
    }
}

/// Result type alias using `BazaarError`.
pub type Result<T> = std::result::Result<T, BazaarError>;
