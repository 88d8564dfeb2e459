//! Endpoint configuration parsing and validation.
//!
//! Validation is fail-fast: a stage can only be constructed from an
//! [`OutputConfig`] that already holds a well-formed absolute URL and a
//! positive timeout, so malformed input is rejected at construction
//! time rather than at send time.

use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// Host-facing field name for the destination URL.
pub const CK_OUTPUT_API: &str = "output_api";
/// Host-facing field name for the connection timeout (seconds).
pub const CK_TIMEOUT: &str = "timeout";

/// Raw configuration as supplied by the host, before validation.
/// Both fields are mandatory on the host surface.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub output_api: String,
    pub timeout: String,
}

/// Errors raised while validating configuration. All of these are fatal:
/// the output stage must not be instantiable with invalid configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidUrl { input: String, reason: String },
    InvalidTimeout { input: String },
    Client(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidUrl { input, reason } => {
                write!(f, "invalid {} value {:?}: {}", CK_OUTPUT_API, input, reason)
            }
            ConfigError::InvalidTimeout { input } => {
                write!(
                    f,
                    "invalid {} value {:?}: expected a positive integer of seconds",
                    CK_TIMEOUT, input
                )
            }
            ConfigError::Client(msg) => write!(f, "failed to build HTTP client: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated endpoint configuration. Immutable once constructed and
/// owned exclusively by the stage instance.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    endpoint: Url,
    timeout: Duration,
}

impl OutputConfig {
    /// Validate the raw `output_api` and `timeout` strings.
    ///
    /// The URL must parse as an absolute URL and the timeout as a
    /// positive integer of seconds, applied uniformly as the connect
    /// and read timeout of the underlying client.
    pub fn parse(output_api: &str, timeout: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(output_api).map_err(|e| ConfigError::InvalidUrl {
            input: output_api.to_string(),
            reason: e.to_string(),
        })?;

        let seconds: u64 = timeout
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidTimeout {
                input: timeout.to_string(),
            })?;
        if seconds == 0 {
            return Err(ConfigError::InvalidTimeout {
                input: timeout.to_string(),
            });
        }

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(seconds),
        })
    }

    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        Self::parse(&raw.output_api, &raw.timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
