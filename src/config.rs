//! Configuration for the orchestrator and its flight-data client
//!
//! The core never reads the environment itself; binaries build these
//! structs (usually via from_env) and pass them in.

use std::env;
use std::time::Duration;

/// Credentials and endpoint for the external flight-data API.
#[derive(Debug, Clone)]
pub struct FlightApiConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl FlightApiConfig {
    /// Read the client config from the environment. None when any piece
    /// is missing, so callers can fall back to the fixture transport.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("FLIGHT_API_BASE_URL").ok()?;
        let client_id = env::var("FLIGHT_API_CLIENT_ID").ok()?;
        let client_secret = env::var("FLIGHT_API_CLIENT_SECRET").ok()?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }
}

/// Retry and timeout knobs for the Query Agent.
///
/// Defaults are deliberate picks, not discovered requirements: two
/// retries on retryable kinds, exponential backoff from 200 ms, and a
/// 10 second ceiling per upstream call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(200),
            call_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Environment overrides for the defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_retries = env::var("FLIGHT_API_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        let call_timeout = env::var("FLIGHT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.call_timeout);

        Self {
            max_retries,
            call_timeout,
            ..defaults
        }
    }
}
