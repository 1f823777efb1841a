//! Shared test utilities for bazaar.

pub mod fixtures;
pub mod logging;
