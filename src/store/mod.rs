//! Document store abstraction.
//!
//! The core treats the store as an opaque service with two capabilities:
//! - a paginated query over a named secondary index with an optional key
//!   filter and a document-inclusion flag
//! - asynchronous single-key set/add/delete/remove operations
//!
//! Both are expressed by the [`DocumentStore`] trait. The production
//! implementation in [`mongo`] is backed by the MongoDB driver; tests use an
//! in-memory implementation. Documents are opaque string payloads and are
//! moved verbatim.

use async_trait::async_trait;

use crate::error::Result;

pub mod mongo;

#[cfg(test)]
pub mod testing;

pub use mongo::MongoStore;

/// One logical index traversal.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    /// Name of the indexed field the view is built over.
    pub index: String,

    /// Optional key filter: only documents whose indexed field equals this
    /// value are returned.
    pub key_filter: Option<String>,

    /// Whether to return document payloads or keys only.
    pub include_docs: bool,

    /// Maximum number of entries per page. Must be greater than zero.
    pub page_size: usize,
}

/// One (key, document) pair returned by an index traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Document key, unique within the store.
    pub key: String,

    /// Document payload. Empty when the query did not include documents.
    pub document: String,
}

/// One fetched page plus the token needed to fetch the page after it.
///
/// A `resume` of `None` means the traversal is exhausted. Entries are
/// produced in a single store-defined stable order: pages from the same
/// traversal never overlap or skip entries, assuming no concurrent mutation
/// of the index.
#[derive(Debug, Clone)]
pub struct PageFetch {
    /// Entries of this page, at most `page_size` of them.
    pub entries: Vec<PageEntry>,

    /// Opaque resume token anchoring the next page, or `None` when there is
    /// no next page.
    pub resume: Option<String>,
}

/// Asynchronous document store interface.
///
/// The store connection behind an implementation is owned by the surrounding
/// export run or task attempt; cursors and schedulers only borrow it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one page of the index traversal described by `query`, starting
    /// after the position identified by `resume` (or from the beginning when
    /// `resume` is `None`).
    ///
    /// Fails with `QueryError::ViewNotFound` if the index does not exist and
    /// with `QueryError::Pagination` if the store aborts the fetch.
    async fn fetch_page(&self, query: &IndexQuery, resume: Option<&str>) -> Result<PageFetch>;

    /// Store a document under `key`, creating or replacing it.
    async fn set(&self, key: &str, document: &str, expiry: Option<u32>) -> Result<()>;

    /// Store a document under `key`, failing with
    /// `StoreWriteError::DuplicateKey` if the key already exists.
    async fn add(&self, key: &str, document: &str, expiry: Option<u32>) -> Result<()>;

    /// Delete the document under `key`, failing with
    /// `StoreWriteError::MissingKey` if it does not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete the document under `key` if it exists. Missing keys are not
    /// an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
