//! Incremental JSON array output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use nerm_core::Record;
use tracing::warn;

use crate::error::{ExportError, Result};

/// Destination for the batches a pagination run produces.
///
/// The driver calls `append` once per non-empty batch and flags the last
/// one, then calls `close` exactly once on every exit path.
pub trait RecordSink {
    fn append(&mut self, records: Vec<Record>, is_final_batch: bool) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// In-memory collector.
impl RecordSink for Vec<Record> {
    fn append(&mut self, records: Vec<Record>, _is_final_batch: bool) -> Result<()> {
        self.extend(records);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes records as one JSON array, one compact object per record.
pub struct JsonArraySink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    finished: bool,
    written: u64,
}

impl JsonArraySink {
    /// Create (or truncate) `path` and write the opening bracket.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| ExportError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"[").map_err(|e| ExportError::io(&path, e))?;
        Ok(Self {
            path,
            writer: Some(writer),
            finished: false,
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl RecordSink for JsonArraySink {
    fn append(&mut self, records: Vec<Record>, is_final_batch: bool) -> Result<()> {
        if self.finished {
            return Err(ExportError::invalid_request(format!(
                "{}: batch appended after the final batch",
                self.path.display()
            )));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(ExportError::invalid_request(format!(
                "{}: sink already closed",
                self.path.display()
            )));
        };

        let last = records.len().saturating_sub(1);
        for (i, record) in records.iter().enumerate() {
            serde_json::to_writer(&mut *writer, record)
                .map_err(|e| ExportError::io(&self.path, e.into()))?;
            if !(is_final_batch && i == last) {
                writer
                    .write_all(b",")
                    .map_err(|e| ExportError::io(&self.path, e))?;
            }
        }
        self.written += records.len() as u64;
        self.finished = is_final_batch;
        Ok(())
    }

    /// Write the closing bracket and flush. Closing twice is a no-op.
    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .write_all(b"]")
                .and_then(|_| writer.flush())
                .map_err(|e| ExportError::io(&self.path, e))?;
        }
        Ok(())
    }
}

impl Drop for JsonArraySink {
    fn drop(&mut self) {
        if self.writer.is_some()
            && let Err(e) = self.close()
        {
            warn!(path = %self.path.display(), "failed to terminate JSON array: {e}");
        }
    }
}
