//! Audit sinks.
//!
//! The gate hands every admission to an `AuditSink`. These adapters cover
//! the common destinations: a JSON-lines file, the `tracing` pipeline, or
//! nowhere.

use crate::application::ports::AuditSink;
use crate::domain::audit::AuditEvent;
use crate::domain::error::AuditError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends one JSON object per line to a file.
///
/// ```text
/// {"ip":"203.0.113.7","timestamp":"2024-05-01T12:00:00Z"}
/// ```
///
/// Each record is flushed before `record` returns.
#[derive(Debug)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesAuditSink {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    /// Returns `AuditError::Io` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// File this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        // Poisoning leaves the file handle usable
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Emits each audit event as an `info` record on target `admission_gate::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "admission_gate::audit",
            client = %event.source,
            timestamp = %event.timestamp.to_rfc3339(),
            "request"
        );
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
