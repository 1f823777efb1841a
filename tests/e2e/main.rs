//! E2E test suite entry point.

mod fixture;
mod search_workflow;
mod serve_workflow;
