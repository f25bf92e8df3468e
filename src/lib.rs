//! Bulk Document Mover Library
//!
//! This library provides the core functionality for docferry, a tool that
//! moves documents in bulk between a clustered document store and a
//! filesystem. It can be used as a standalone library to build migration,
//! backup and benchmark-load tools.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `codec`: Delimited record encoding and decoding
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Paginated index export into sequential page files
//! - `import`: Bounded-concurrency bulk writes back into the store
//! - `store`: Document store abstraction and the MongoDB-backed client
//!
//! # Example
//!
//! ```no_run
//! use docferry::config::Config;
//! use docferry::export::ExportOrchestrator;
//! use docferry::store::MongoStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let store = MongoStore::connect(&config.store).await?;
//!
//!     let report = ExportOrchestrator::new(&store, &config.export).run().await?;
//!     println!("Exported {} records", report.records_written);
//!
//!     store.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod store;

// Re-export commonly used types
pub use codec::{RecordCodec, RecordFormat};
pub use config::Config;
pub use error::{DocferryError, Result};
pub use export::{ExportOrchestrator, ExportReport, PageCursor, PageFileWriter};
pub use import::{
    ActionKind, BulkActionRecord, BulkWriteScheduler, FailureTally, FailureToleranceGate,
    ImportTask, Verdict,
};
pub use store::{DocumentStore, MongoStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
