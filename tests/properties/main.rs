//! Property test suite.

mod pagination_props;
mod token_props;
