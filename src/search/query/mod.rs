//! Query Builder
//!
//! [`builder`] turns search parameters into a [`ast::PhaseQuery`] tree and
//! [`render`] turns that tree into parameterised SQL. No request value ever
//! reaches the SQL text.

pub mod ast;
pub mod builder;
pub mod render;

pub use ast::{PhaseQuery, Predicate};
pub use builder::{QueryBuilder, SearchParams, ordering};
pub use render::{RenderedQuery, render};
