//! Append-only CSV record sink with idempotent header emission.
//!
//! Each sink owns one destination file and one lock. The exists-check and
//! the header/row writes happen under that lock, so concurrent workers can
//! share a sink without duplicating the header or interleaving rows. The
//! sink does not validate row shape against prior rows; callers keep column
//! sets consistent per destination.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// Filesystem failure on the output path. Fatal: silent data loss on the
/// output path is unacceptable.
#[derive(Debug, Error)]
pub enum SinkWriteError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only writer for one CSV destination.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the destination with its header row unless it already holds
    /// data. Existing, non-empty stores are left untouched.
    pub async fn ensure_header<H: AsRef<str> + Sync>(
        &self,
        headers: &[H],
    ) -> Result<(), SinkWriteError> {
        let _guard = self.lock.lock().await;
        let mut writer = self.open_writer()?;
        if self.is_empty_destination() {
            self.write_record(&mut writer, headers)?;
            self.flush(&mut writer)?;
        }
        Ok(())
    }

    /// Append one data row, emitting the header first on a fresh destination.
    pub async fn append<H, R>(&self, headers: &[H], row: &[R]) -> Result<(), SinkWriteError>
    where
        H: AsRef<str> + Sync,
        R: AsRef<str> + Sync,
    {
        let _guard = self.lock.lock().await;
        let needs_header = self.is_empty_destination();
        let mut writer = self.open_writer()?;
        if needs_header {
            self.write_record(&mut writer, headers)?;
        }
        self.write_record(&mut writer, row)?;
        self.flush(&mut writer)
    }

    fn is_empty_destination(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        }
    }

    fn open_writer(&self) -> Result<csv::Writer<std::fs::File>, SinkWriteError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| SinkWriteError::Open {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SinkWriteError::Open {
                path: self.path.clone(),
                source: e,
            })?;
        // Flexible: enrichment rows may be narrower than their header
        // (synthetic Winner column, schema drift across documents).
        Ok(csv::WriterBuilder::new().flexible(true).from_writer(file))
    }

    fn write_record<F: AsRef<str>>(
        &self,
        writer: &mut csv::Writer<std::fs::File>,
        fields: &[F],
    ) -> Result<(), SinkWriteError> {
        writer
            .write_record(fields.iter().map(|f| f.as_ref()))
            .map_err(|e| SinkWriteError::Append {
                path: self.path.clone(),
                source: e,
            })
    }

    fn flush(&self, writer: &mut csv::Writer<std::fs::File>) -> Result<(), SinkWriteError> {
        writer.flush().map_err(|e| SinkWriteError::Flush {
            path: self.path.clone(),
            source: e,
        })
    }
}
