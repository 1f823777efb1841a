//! Storage layer for bazaar
//!
//! SQLite holds listings and their side relations; search primitives are
//! registered as SQL functions on every connection.

pub mod cancel;
pub mod functions;
pub mod migrations;
pub mod sqlite;

pub use cancel::Cancellation;
pub use sqlite::{Catalog, Database, ImportReport, NewListing};
