//! Export path: stream documents out of a store index into page files.
//!
//! The export pipeline is built from three components:
//!
//! 1. **PageCursor**: stable page-by-page traversal of one index query
//! 2. **PageFileWriter**: sequential delimited-record sink, one file per page
//! 3. **ExportOrchestrator**: drives key filters against the cursor and the
//!    sink, rotating files and containing per-filter and per-page errors
//!
//! The pipeline is single threaded by design: the bottleneck is the store's
//! view-query throughput, not client-side parallelism, and sequential
//! pagination gives a simple failure model that is resumable by page number.

pub mod cursor;
pub mod orchestrator;
pub mod writer;

pub use cursor::{Page, PageCursor};
pub use orchestrator::{ExportOrchestrator, ExportReport};
pub use writer::{page_file_path, PageFileWriter};
