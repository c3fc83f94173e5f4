//! Shared HTTP client for checkin requests.
//!
//! One [`reqwest::Client`] (and therefore one connection pool) is built per
//! [`HttpTransport`](crate::transport::HttpTransport) and reused across
//! probes. The User-Agent is set per request because it depends on the
//! device being impersonated.

use crate::config::ProbeConfig;
use crate::error::CheckinError;

/// Content type the checkin endpoint expects for protobuf bodies.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuffer";

/// Build a [`reqwest::Client`] configured for checkin requests.
///
/// The client has:
/// - Timeout from config
/// - Transparent gzip decoding of response bodies
/// - No cookie store (every probe is an unrelated, anonymous device)
///
/// # Errors
///
/// Returns [`CheckinError::Transport`] if the client cannot be constructed.
pub fn build_client(config: &ProbeConfig) -> Result<reqwest::Client, CheckinError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.timeout())
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| CheckinError::Transport(format!("failed to build HTTP client: {e}")))
}
