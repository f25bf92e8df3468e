//! Error handling module for docferry operations.
//!
//! This module provides the error taxonomy used across the crate:
//! - Fatal errors (store connection, destination filesystem) that abort a run
//! - Contained errors (per key filter, per page, per operation) that are
//!   logged and counted but do not terminate the unit of work
//! - A crate-wide [`Result`] alias
//!
//! The propagation policy is decided by the callers, not here: a
//! `QueryError` aborts nothing on its own, the export orchestrator catches
//! it and moves on to the next key filter.

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    CodecError, ConfigError, ConnectionError, DocferryError, PageFileError, QueryError, Result,
    StoreWriteError,
};
