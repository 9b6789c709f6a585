//! Router contract tests.
//!
//! Test organization:
//! - contracts.rs: token masks, query-argument masks, 404/405 handling

mod contracts;
