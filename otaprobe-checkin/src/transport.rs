//! Checkin transport: deliver an encoded request, return the raw response.
//!
//! [`CheckinTransport`] is the seam between the pipeline and the network.
//! [`HttpTransport`] talks to the real endpoint; tests substitute stubs that
//! return canned bytes, fail, or never answer.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::config::ProbeConfig;
use crate::error::CheckinError;
use crate::http::{build_client, PROTOBUF_CONTENT_TYPE};
use crate::request::CheckinRequestPayload;

/// A way of delivering checkin requests.
///
/// Implementations hold no per-request state; a single instance may serve
/// any number of concurrent probes. No retries happen at this layer.
pub trait CheckinTransport: Send + Sync {
    /// Send `payload` once and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Transport`] on connection failure, timeout, or
    /// a non-success HTTP status.
    fn send(
        &self,
        payload: &CheckinRequestPayload,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, CheckinError>> + Send;
}

/// HTTPS transport to the checkin endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    compress: bool,
}

impl HttpTransport {
    /// Create a transport for `config.endpoint` with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Config`] if the config is invalid, or
    /// [`CheckinError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ProbeConfig) -> Result<Self, CheckinError> {
        config.validate()?;
        Ok(Self {
            client: build_client(config)?,
            endpoint: config.endpoint.clone(),
            compress: config.compress_requests,
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CheckinTransport for HttpTransport {
    async fn send(
        &self,
        payload: &CheckinRequestPayload,
        timeout: Duration,
    ) -> Result<Vec<u8>, CheckinError> {
        tracing::debug!(endpoint = %self.endpoint, bytes = payload.body().len(), "posting checkin");

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)
            .header(reqwest::header::USER_AGENT, payload.user_agent());
        request = if self.compress {
            request
                .header(reqwest::header::CONTENT_ENCODING, "gzip")
                .body(gzip(payload.body())?)
        } else {
            request.body(payload.body().to_vec())
        };

        let response = request
            .send()
            .await
            .map_err(|e| CheckinError::Transport(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "checkin endpoint returned error status");
            return Err(CheckinError::Transport(format!(
                "checkin endpoint returned HTTP {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CheckinError::Transport(describe_request_error(&e)))?;

        tracing::debug!(%status, bytes = body.len(), "checkin response received");
        Ok(body.to_vec())
    }
}

fn gzip(body: &[u8]) -> Result<Vec<u8>, CheckinError> {
    let compress_error =
        |e: std::io::Error| CheckinError::Transport(format!("cannot compress request: {e}"));
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len()), Compression::default());
    encoder.write_all(body).map_err(compress_error)?;
    encoder.finish().map_err(compress_error)
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}
