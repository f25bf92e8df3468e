//! Paginated cursor over a store index traversal.
//!
//! A cursor is created per key-filter value, advanced page by page until
//! exhausted, then discarded. It owns no store connection; it borrows one
//! for its lifetime. Page boundaries are determined entirely by the store:
//! the cursor never reorders or deduplicates entries.

use tracing::debug;

use crate::error::{ConfigError, QueryError, Result};
use crate::store::{DocumentStore, IndexQuery, PageEntry};

/// One page of (key, document) entries.
pub type Page = Vec<PageEntry>;

/// Mutable traversal state bound to one [`IndexQuery`].
///
/// [`has_next`](Self::has_next) prefetches one page so the caller can probe
/// for exhaustion without consuming anything; [`next`](Self::next) hands the
/// buffered page out. Calling `next` on an exhausted cursor is an error.
pub struct PageCursor<'a> {
    store: &'a dyn DocumentStore,
    query: IndexQuery,
    resume: Option<String>,
    buffered: Option<Page>,
    /// The buffered page is the last one the store will produce.
    final_page_buffered: bool,
    exhausted: bool,
    pages_served: u64,
}

impl<'a> PageCursor<'a> {
    /// Open a cursor for one index traversal.
    pub fn open(store: &'a dyn DocumentStore, query: IndexQuery) -> Result<Self> {
        if query.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(Self {
            store,
            query,
            resume: None,
            buffered: None,
            final_page_buffered: false,
            exhausted: false,
            pages_served: 0,
        })
    }

    /// Whether another page is available, fetching ahead if necessary.
    pub async fn has_next(&mut self) -> Result<bool> {
        if self.buffered.is_some() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }

        let fetch = self
            .store
            .fetch_page(&self.query, self.resume.as_deref())
            .await?;

        if fetch.entries.is_empty() {
            self.exhausted = true;
            return Ok(false);
        }

        self.final_page_buffered = fetch.resume.is_none();
        self.resume = fetch.resume;
        self.buffered = Some(fetch.entries);
        Ok(true)
    }

    /// Take the next page.
    ///
    /// Fails with `QueryError::ExhaustedCursor` when called after
    /// [`has_next`](Self::has_next) returned false.
    pub async fn next(&mut self) -> Result<Page> {
        if !self.has_next().await? {
            return Err(QueryError::ExhaustedCursor.into());
        }

        match self.buffered.take() {
            Some(page) => {
                if self.final_page_buffered {
                    self.exhausted = true;
                }
                self.pages_served += 1;
                debug!(
                    "Serving page {} with {} entries",
                    self.pages_served,
                    page.len()
                );
                Ok(page)
            }
            None => Err(QueryError::ExhaustedCursor.into()),
        }
    }

    /// Number of pages served so far.
    pub fn pages_served(&self) -> u64 {
        self.pages_served
    }
}
