//! Sequential page file sink.
//!
//! One writer owns one page file for its lifetime. Files are created, never
//! appended to: a pre-existing destination is an error unless overwrite is
//! requested. Closing is idempotent and must happen on every code path that
//! opened the writer, including error paths; a page that failed mid-write is
//! left truncated for the orchestrator to deal with.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::codec::RecordCodec;
use crate::error::{PageFileError, Result};

/// Build the page file path: `<baseName>-<page:%05d>` under `dir`, or under
/// the current working directory when `dir` is empty.
pub fn page_file_path(dir: &str, base_name: &str, page: u64) -> PathBuf {
    let name = format!("{base_name}-{page:05}");
    if dir.is_empty() {
        PathBuf::from(name)
    } else {
        Path::new(dir).join(name)
    }
}

/// Writes one page of delimited records to a file.
#[derive(Debug)]
pub struct PageFileWriter {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    codec: RecordCodec,
    written: usize,
}

impl PageFileWriter {
    /// Create the page file and return a writer for it.
    ///
    /// Fails with `PageFileError::AlreadyExists` if the destination exists
    /// and `overwrite` is false.
    pub async fn create(
        dir: &str,
        base_name: &str,
        page: u64,
        codec: RecordCodec,
        overwrite: bool,
    ) -> Result<Self> {
        let path = page_file_path(dir, base_name, page);
        info!("Creating file '{}'...", path.display());

        let open = if overwrite {
            File::create(&path).await
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
        };

        let file = open.map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                PageFileError::AlreadyExists(path.display().to_string())
            } else {
                PageFileError::Create {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path,
            codec,
            written: 0,
        })
    }

    /// Path of the file this writer owns.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one key/document record.
    pub async fn write(&mut self, key: &str, document: &str) -> Result<()> {
        let record = self.codec.encode(key, document)?;
        let writer = self.writer.as_mut().ok_or_else(|| PageFileError::Write {
            path: self.path.display().to_string(),
            reason: "writer is closed".to_string(),
        })?;

        writer
            .write_all(record.as_bytes())
            .await
            .map_err(|e| PageFileError::Write {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.written += 1;
        Ok(())
    }

    /// Flush and release the file. Safe to call more than once; only the
    /// first call does any work.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await.map_err(|e| PageFileError::Write {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
            debug!(
                "Closed '{}' ({} records)",
                self.path.display(),
                self.written
            );
        }
        Ok(())
    }
}
