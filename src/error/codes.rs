//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Request errors (malformed input)
//! - 2xx: Pagination errors (cursor tokens)
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for the search surface.
///
/// Each variant maps to a numeric code (e.g., `CursorNotFound` -> E201).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Request errors (1xx)
    // ========================================
    /// E101: Request body or parameter is malformed
    InvalidRequest,
    /// E102: A filter value does not decode into its role's shape
    InvalidFilterShape,
    /// E103: A filter role is not known (strict mode only)
    UnknownFilterRole,

    // ========================================
    // Pagination errors (2xx)
    // ========================================
    /// E201: Cursor token does not resolve
    CursorNotFound,
    /// E202: Cursor token is past its TTL
    CursorExpired,
    /// E203: Search session token does not resolve
    SessionNotFound,
    /// E204: Search session token is past its TTL
    SessionExpired,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // Search errors (4xx)
    // ========================================
    /// E402: Search exceeded its deadline
    SearchTimeout,
    /// E403: Search was cancelled by the caller
    SearchCancelled,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E604: Database operation failed
    DatabaseError,
    /// E605: Serialization/deserialization failed
    SerializationError,
    /// E606: IO operation failed
    IoError,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
    /// E905: Generic not found (catch-all)
    NotFound,
}

/// What the caller should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Drop the cursor and start a fresh search.
    FreshSearch,
    /// Correct the request and resend it.
    FixInput,
    /// Transient failure; the same request may succeed later.
    RetryLater,
    /// Bug or misconfiguration; report it.
    Report,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `CursorNotFound` -> 201).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::InvalidRequest => 101,
            Self::InvalidFilterShape => 102,
            Self::UnknownFilterRole => 103,

            Self::CursorNotFound => 201,
            Self::CursorExpired => 202,
            Self::SessionNotFound => 203,
            Self::SessionExpired => 204,

            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,

            Self::SearchTimeout => 402,
            Self::SearchCancelled => 403,

            Self::DatabaseError => 604,
            Self::SerializationError => 605,
            Self::IoError => 606,

            Self::InternalError => 901,
            Self::NotFound => 905,
        }
    }

    /// Get the error code as a formatted string (e.g., "E201").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Check the request body against the search request schema",
            Self::InvalidFilterShape => "Send the filter value in the shape its role expects (price: {min,max}, color: [..], checkbox: bool, dimensions: {min,max,dimension})",
            Self::UnknownFilterRole => "Remove the filter or upgrade the server; unknown roles are rejected in strict mode",

            Self::CursorNotFound => "The cursor is unknown to this server. Repeat the search without a cursor",
            Self::CursorExpired => "The cursor has expired. Repeat the search without a cursor",
            Self::SessionNotFound => "The search id is unknown. Send filters and sort order again",
            Self::SessionExpired => "The search id has expired. Send filters and sort order again",

            Self::ConfigInvalid => "Run `bazaar config` to see current values. Check TOML syntax in config file",
            Self::ConfigMissingRequired => "Set the required config value in config.toml or via BAZAAR_* environment variables",

            Self::SearchTimeout => "Narrow the query or raise timeout_ms / search.query_timeout",
            Self::SearchCancelled => "The search was cancelled before it completed. Retry if still needed",

            Self::DatabaseError => "The listing store failed. Retry later; check database health if it persists",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",
            Self::IoError => "File operation failed. Check path exists and permissions are correct",

            Self::InternalError => "An unexpected error occurred. Please report this issue with full error output",
            Self::NotFound => "The requested resource was not found. Check the identifier",
        }
    }

    /// Check if this error is potentially recoverable by the caller.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::SerializationError | Self::InternalError | Self::ConfigInvalid
        )
    }

    /// The recovery path a client should take.
    #[must_use]
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::CursorNotFound | Self::CursorExpired | Self::SessionNotFound | Self::SessionExpired => {
                Recovery::FreshSearch
            }
            Self::InvalidRequest | Self::InvalidFilterShape | Self::UnknownFilterRole => {
                Recovery::FixInput
            }
            Self::SearchTimeout | Self::SearchCancelled | Self::DatabaseError | Self::IoError => {
                Recovery::RetryLater
            }
            Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::SerializationError
            | Self::InternalError
            | Self::NotFound => Recovery::Report,
        }
    }

    /// HTTP-equivalent status for hosts that expose the engine over HTTP.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest | Self::InvalidFilterShape | Self::UnknownFilterRole => 400,
            Self::CursorNotFound
            | Self::CursorExpired
            | Self::SessionNotFound
            | Self::SessionExpired
            | Self::NotFound => 404,
            Self::SearchCancelled => 499,
            Self::SearchTimeout => 504,
            Self::DatabaseError => 503,
            Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::SerializationError
            | Self::IoError
            | Self::InternalError => 500,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "request",
            2 => "pagination",
            3 => "config",
            4 => "search",
            6 => "storage",
            9 => "internal",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::InvalidRequest,
            Self::InvalidFilterShape,
            Self::UnknownFilterRole,
            Self::CursorNotFound,
            Self::CursorExpired,
            Self::SessionNotFound,
            Self::SessionExpired,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::SearchTimeout,
            Self::SearchCancelled,
            Self::DatabaseError,
            Self::SerializationError,
            Self::IoError,
            Self::InternalError,
            Self::NotFound,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
