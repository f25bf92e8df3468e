//! Export run orchestration.
//!
//! Drives the key-filter set against the paginated cursor and the page file
//! sink. The pipeline is strictly sequential: each fetched page is fully
//! written before the cursor advances, so the write path never runs ahead of
//! the read path. Error containment is per key filter for traversal errors
//! and per page for write errors; only connection loss and an unusable
//! destination abort the run.

use tracing::{error, info, warn};

use crate::codec::RecordCodec;
use crate::config::ExportConfig;
use crate::error::{DocferryError, PageFileError, Result};
use crate::store::{DocumentStore, IndexQuery};

use super::cursor::{Page, PageCursor};
use super::writer::PageFileWriter;

/// Summary of one export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Page files written completely.
    pub pages_written: u64,
    /// Records across all written pages.
    pub records_written: u64,
    /// Pages abandoned because of a write error.
    pub pages_failed: u64,
    /// Key filters traversed to exhaustion.
    pub key_filters_done: usize,
    /// Key filters abandoned because of a query/pagination error.
    pub key_filters_failed: usize,
}

/// Orchestrates one export run over a borrowed store connection.
pub struct ExportOrchestrator<'a> {
    store: &'a dyn DocumentStore,
    config: &'a ExportConfig,
}

impl<'a> ExportOrchestrator<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &'a ExportConfig) -> Self {
        Self { store, config }
    }

    /// Run the export to completion.
    ///
    /// Key filters are traversed in the configured order, without
    /// reordering or deduplication: a duplicate filter produces a duplicate
    /// traversal. Page numbers increase monotonically across the whole run
    /// and are never reset between key filters.
    pub async fn run(&self) -> Result<ExportReport> {
        let codec = RecordCodec::new(self.config.format.clone());
        let mut report = ExportReport::default();
        let mut page_no: u64 = 0;

        let filters: Vec<Option<String>> = if self.config.key_filters.is_empty() {
            vec![None]
        } else {
            self.config.key_filters.iter().cloned().map(Some).collect()
        };

        for filter in filters {
            info!("___________________________________");
            match &filter {
                Some(key) => info!("Exporting documents for key filter '{key}'..."),
                None => info!("Exporting all documents..."),
            }

            let query = IndexQuery {
                index: self.config.view.clone(),
                key_filter: filter,
                include_docs: self.config.include_docs,
                page_size: self.config.page_size,
            };

            match self.export_one_filter(query, &codec, &mut page_no, &mut report).await {
                Ok(()) => report.key_filters_done += 1,
                // An unopenable destination is fatal for the whole run.
                Err(
                    e @ DocferryError::PageFile(
                        PageFileError::Create { .. } | PageFileError::AlreadyExists(_),
                    ),
                ) => return Err(e),
                Err(e) => {
                    // Traversal errors are contained to this key filter.
                    warn!("Abandoning key filter: {e}");
                    report.key_filters_failed += 1;
                }
            }
        }

        info!(
            "Export finished: {} records in {} pages ({} pages failed, {} key filters failed)",
            report.records_written,
            report.pages_written,
            report.pages_failed,
            report.key_filters_failed
        );
        Ok(report)
    }

    /// Traverse one key filter, writing each page to its own file.
    ///
    /// Returns `Err` only for traversal errors; page write errors are
    /// absorbed into the report. Page file creation errors propagate
    /// through the caller and abort the run: a destination that cannot
    /// even open a file is unusable.
    async fn export_one_filter(
        &self,
        query: IndexQuery,
        codec: &RecordCodec,
        page_no: &mut u64,
        report: &mut ExportReport,
    ) -> Result<()> {
        let mut cursor = PageCursor::open(self.store, query)?;

        while cursor.has_next().await? {
            let page = cursor.next().await?;
            info!("Writing page {page_no}...");

            let mut writer = match PageFileWriter::create(
                &self.config.output_dir,
                &self.config.base_name,
                *page_no,
                codec.clone(),
                self.config.overwrite,
            )
            .await
            {
                Ok(writer) => writer,
                Err(e) => {
                    error!("Destination is unusable: {e}");
                    return Err(e);
                }
            };

            let write_result = Self::write_page(&mut writer, &page).await;
            // Close on every path, exactly once per opened writer.
            let close_result = writer.close().await;

            match write_result.and(close_result) {
                Ok(()) => {
                    report.pages_written += 1;
                    report.records_written += page.len() as u64;
                }
                Err(e) => {
                    error!("Failed to write page {page_no}: {e}");
                    report.pages_failed += 1;
                }
            }

            // The page number is consumed whether or not the page landed,
            // keeping the sequence resumable by number.
            *page_no += 1;
        }

        Ok(())
    }

    async fn write_page(writer: &mut PageFileWriter, page: &Page) -> Result<()> {
        for entry in page {
            writer.write(&entry.key, &entry.document).await?;
        }
        Ok(())
    }
}
