//! Fire-and-forget JSON-over-HTTP forwarding stage.
//!
//! An upstream pipeline hands this crate structured records; each record
//! is relayed as one JSON-encoded HTTP POST to a single configured
//! endpoint. Submission returns before the network exchange completes,
//! and the outcome of the exchange is observable only through logs and
//! delivery counters.

pub mod config;
pub mod dispatch;
pub mod output;
pub mod record;

pub use config::{ConfigError, OutputConfig, RawConfig};
pub use dispatch::{
    DeliverySnapshot, DeliveryStats, DispatchOutcome, HttpTransport, Transport, CONTENT_TYPE_JSON,
};
pub use output::{HttpOutput, WriteError};
pub use record::{encode, EncodeError, Record};

// Re-export tracing for use by embedding hosts
pub use tracing;
