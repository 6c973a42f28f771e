//! Append-only audit sinks.
//!
//! A sink accepts [`AuditEvent`]s and never gets a say in the outcome of the
//! request that produced them: callers go through [`record_best_effort`],
//! which logs and drops any failure.

use async_trait::async_trait;
use helio_core::AuditEvent;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Error type for audit writes.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to serialize audit event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write audit event: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one event.
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Record an event, logging and discarding any failure.
pub async fn record_best_effort(sink: &dyn AuditSink, event: &AuditEvent) {
    if let Err(e) = sink.record(event).await {
        tracing::warn!(
            action = %event.action,
            resource = %event.resource,
            error = %e,
            "Failed to record audit event"
        );
    }
}

// ============================================================================
// TRACING SINK
// ============================================================================

/// Emits every event as a structured `tracing` event on the `audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let details = serde_json::to_string(&event.details)?;
        tracing::info!(
            target: "audit",
            timestamp = %event.timestamp.to_rfc3339(),
            action = %event.action,
            resource = %event.resource,
            client_addr = %event.actor.client_addr,
            user_agent = %event.actor.user_agent,
            status = event.outcome.status,
            outcome = %event.outcome.label,
            details = %details,
            "audit"
        );
        Ok(())
    }
}

// ============================================================================
// JSON LINES SINK
// ============================================================================

/// Appends one JSON object per line to a file.
///
/// Each event is serialised first and written with a single call while the
/// file lock is held, so concurrent appends never interleave.
#[derive(Debug)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonLinesAuditSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY SINK
// ============================================================================

/// Keeps events in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("event buffer poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

// ============================================================================
// FANOUT SINK
// ============================================================================

/// Writes every event to each inner sink.
///
/// A failing sink does not stop the others; the first error is returned
/// after all sinks were attempted.
#[derive(Clone, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl AuditSink for FanoutAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
