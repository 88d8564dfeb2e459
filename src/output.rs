//! The forwarding stage: lifecycle gate and write paths.

use crate::config::{ConfigError, OutputConfig};
use crate::dispatch::{self, DeliverySnapshot, DeliveryStats, HttpTransport, Transport};
use crate::record::{encode, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Synchronous submission failures. Everything that happens after the
/// request is handed to the runtime is terminal at the log level; only
/// these propagate to the caller.
#[derive(Debug)]
pub enum WriteError {
    /// The record's fields could not be serialized.
    Encode(String),
    /// The request could not be handed to the runtime.
    Dispatch(String),
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Encode(msg) => write!(f, "failed to encode record: {}", msg),
            WriteError::Dispatch(msg) => write!(f, "failed to dispatch record: {}", msg),
        }
    }
}

impl std::error::Error for WriteError {}

/// HTTP output stage. Accepts records while running and relays each as
/// a fire-and-forget POST; once stopped, further sends are silently
/// dropped.
pub struct HttpOutput {
    transport: Arc<dyn Transport>,
    stats: Arc<DeliveryStats>,
    running: AtomicBool,
}

impl HttpOutput {
    /// Construct the stage from validated configuration. The shared
    /// HTTP client is built here, so invalid configuration never yields
    /// a stage.
    pub fn new(config: OutputConfig) -> Result<Self, ConfigError> {
        info!(
            output_api = %config.endpoint(),
            timeout_secs = config.timeout().as_secs(),
            "HTTP output configured"
        );
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Construct the stage over an arbitrary transport. Tests substitute
    /// a mock here.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            stats: Arc::new(DeliveryStats::default()),
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop accepting new records. Idempotent and never reverted;
    /// requests already in flight complete or fail on their own.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Submit one record for forwarding. Returns once the exchange has
    /// been handed to the runtime; delivery is never reported back.
    /// While stopped this returns immediately without encoding or
    /// dispatching.
    pub fn write(&self, record: &Record) -> Result<(), WriteError> {
        if !self.is_running() {
            return Ok(());
        }

        let payload = encode(record).map_err(|e| {
            warn!(error = %e, "record dropped");
            WriteError::Encode(e.0)
        })?;

        let handle = Handle::try_current().map_err(|e| {
            warn!(error = %e, "record dropped");
            WriteError::Dispatch(e.to_string())
        })?;

        dispatch::spawn_exchange(
            &handle,
            Arc::clone(&self.transport),
            Arc::clone(&self.stats),
            payload,
        );
        Ok(())
    }

    /// Submit a batch. Each record goes through the single-record path,
    /// which owns the stop check; a batch racing a concurrent stop may
    /// be cut partway rather than completing in full.
    pub fn write_batch(&self, records: &[Record]) -> Result<(), WriteError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Counters for asynchronous delivery outcomes.
    pub fn delivery_stats(&self) -> DeliverySnapshot {
        self.stats.snapshot()
    }
}
