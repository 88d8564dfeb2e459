//! Asynchronous dispatch of encoded payloads to the configured endpoint.
//!
//! Submission hands the exchange to a detached task on the runtime; the
//! caller never awaits it and no result travels back. Outcomes are
//! routed to tracing and to the stage's [`DeliveryStats`] counters, the
//! only places delivery problems become visible.

use crate::config::{ConfigError, OutputConfig};
use bytes::Bytes;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Content type sent with every forwarded record.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Outcome of one completed exchange. Observed only by logs and
/// counters; nothing is retried and nothing reaches the original caller.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// 200 OK.
    Delivered,
    /// Successful (2xx) status other than exactly 200. An anomaly, not
    /// an error.
    UnexpectedStatus(u16),
    /// Non-2xx status. Accepted without escalation.
    Rejected(u16),
    /// Network-level failure: connection refused, timeout, DNS failure.
    TransportFailure(String),
}

/// Trait for carrying one payload to the endpoint (abstracts the HTTP
/// client so tests can substitute a mock transport).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, payload: Bytes) -> DispatchOutcome;
}

/// reqwest-backed transport. One shared client per stage, built once at
/// construction; its connection pool tolerates the concurrent in-flight
/// requests a batch produces.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build the shared client with the configured timeout applied as
    /// connect, read, and total request timeout.
    pub fn new(config: &OutputConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .read_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint().clone(),
        })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post(&self, payload: Bytes) -> DispatchOutcome {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE_JSON)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DispatchOutcome::TransportFailure(e.to_string()),
        };

        let status = response.status();
        // Drain the body so the pooled connection is released in every
        // outcome.
        let _ = response.bytes().await;

        if status.as_u16() == 200 {
            DispatchOutcome::Delivered
        } else if status.is_success() {
            DispatchOutcome::UnexpectedStatus(status.as_u16())
        } else {
            DispatchOutcome::Rejected(status.as_u16())
        }
    }
}

/// Counters for asynchronous delivery outcomes, shared between the
/// stage and its detached tasks.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    dispatched: AtomicU64,
    delivered: AtomicU64,
    transport_failures: AtomicU64,
    unexpected_status: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliverySnapshot {
    pub dispatched: u64,
    pub delivered: u64,
    pub transport_failures: u64,
    pub unexpected_status: u64,
    pub rejected: u64,
}

impl DeliveryStats {
    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: &DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Delivered => &self.delivered,
            DispatchOutcome::UnexpectedStatus(_) => &self.unexpected_status,
            DispatchOutcome::Rejected(_) => &self.rejected,
            DispatchOutcome::TransportFailure(_) => &self.transport_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            unexpected_status: self.unexpected_status.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Spawn the detached exchange for one payload. Returns as soon as the
/// task is handed to the runtime; the task is never awaited or
/// cancelled, so requests already in flight outlive a stop.
pub(crate) fn spawn_exchange(
    handle: &Handle,
    transport: Arc<dyn Transport>,
    stats: Arc<DeliveryStats>,
    payload: Bytes,
) {
    stats.record_dispatch();
    handle.spawn(async move {
        let outcome = transport.post(payload).await;
        match &outcome {
            DispatchOutcome::Delivered => debug!("record delivered"),
            DispatchOutcome::UnexpectedStatus(status) => {
                warn!(status, "unexpected HTTP response status")
            }
            DispatchOutcome::Rejected(status) => debug!(status, "endpoint rejected record"),
            DispatchOutcome::TransportFailure(error) => {
                warn!(error = %error, "async forward request failed")
            }
        }
        stats.record_outcome(&outcome);
    });
}
