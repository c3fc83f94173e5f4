//! # otaprobe-checkin
//!
//! Asks Google's Android checkin service whether an OTA update exists for a
//! build fingerprint, the same way a device does when it checks in.
//!
//! ## Pipeline
//!
//! Data flows strictly through five stages, each usable on its own:
//!
//! 1. [`fingerprint`]: parse and validate the build fingerprint
//! 2. [`request`]: encode an anonymous checkin request for it
//! 3. [`transport`]: POST the request, return the raw response bytes
//! 4. [`decode`]: decode the settings list and correlate OTA entries
//! 5. [`resolve`]: pick the applicable update, if any
//!
//! A malformed fingerprint is rejected before any network activity. "No
//! update" is a successful [`ProbeResult`] with `found == false`; every
//! failure is a [`CheckinError`].
//!
//! ## Concurrency
//!
//! A [`Prober`] holds no per-probe state, so one instance can run any number
//! of probes in parallel. The only shared resource is the HTTPS connection
//! pool inside [`HttpTransport`].

pub mod config;
pub mod decode;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod proto;
pub mod request;
pub mod resolve;
pub mod text;
pub mod transport;
pub mod types;

pub use config::ProbeConfig;
pub use decode::{decode, DecodedResponse, Setting};
pub use error::{CheckinError, Result};
pub use fingerprint::BuildFingerprint;
pub use request::{CheckinIdentity, CheckinRequestPayload, HardwareIds};
pub use resolve::resolve;
pub use transport::{CheckinTransport, HttpTransport};
pub use types::{FoundUpdate, PackageKind, ProbeResult, UpdateEntry};

/// Runs the build → send → decode → resolve pipeline over a transport.
#[derive(Debug, Clone)]
pub struct Prober<T = HttpTransport> {
    transport: T,
    config: ProbeConfig,
}

impl Prober<HttpTransport> {
    /// Create a prober talking HTTPS to `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Config`] if the config is invalid.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { transport, config })
    }
}

impl<T: CheckinTransport> Prober<T> {
    /// Create a prober over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Config`] if the config is invalid.
    pub fn with_transport(transport: T, config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The configuration this prober was built with.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Build a fresh identity for one probe, attaching random hardware ids
    /// when the config asks for them.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::MalformedFingerprint`] for an invalid fingerprint.
    pub fn identity(&self, fingerprint: &str, model_code: Option<&str>) -> Result<CheckinIdentity> {
        let identity = CheckinIdentity::parse(fingerprint, model_code)?;
        Ok(if self.config.randomize_hardware_ids {
            identity.with_hardware_ids(HardwareIds::random())
        } else {
            identity
        })
    }

    /// Send a checkin for `identity` and return the raw response body.
    ///
    /// The exchange is bounded by the configured timeout even if the
    /// transport itself never returns.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Transport`] on delivery failure or timeout.
    pub async fn fetch(&self, identity: &CheckinIdentity) -> Result<Vec<u8>> {
        let payload = request::build(identity, &self.config);
        let timeout = self.config.timeout();

        match tokio::time::timeout(timeout, self.transport.send(&payload, timeout)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    fingerprint = %identity.fingerprint(),
                    timeout_secs = self.config.timeout_seconds,
                    "checkin timed out"
                );
                Err(CheckinError::Transport(format!(
                    "checkin timed out after {}s",
                    self.config.timeout_seconds
                )))
            }
        }
    }

    /// Fetch and decode the checkin response for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Transport`] or [`CheckinError::Decode`].
    pub async fn checkin(&self, identity: &CheckinIdentity) -> Result<DecodedResponse> {
        let body = self.fetch(identity).await?;
        decode::decode(&body)
    }

    /// Run the full pipeline for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Transport`] or [`CheckinError::Decode`].
    pub async fn probe_identity(&self, identity: &CheckinIdentity) -> Result<ProbeResult> {
        let response = self.checkin(identity).await?;
        let result = resolve::resolve(
            identity.fingerprint(),
            response.entries(),
            identity.device_label(),
        );
        tracing::info!(
            fingerprint = %identity.fingerprint(),
            found = result.found,
            tag = result.tag_name().unwrap_or("-"),
            "probe finished"
        );
        Ok(result)
    }

    /// Parse `fingerprint` and run the full pipeline for it.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::MalformedFingerprint`] (without touching the
    /// network), [`CheckinError::Transport`] or [`CheckinError::Decode`].
    pub async fn probe(&self, fingerprint: &str, model_code: Option<&str>) -> Result<ProbeResult> {
        let identity = self.identity(fingerprint, model_code)?;
        self.probe_identity(&identity).await
    }
}

/// Probe the checkin service once for `fingerprint`.
///
/// Convenience wrapper building a one-off [`Prober`] over HTTPS. Batch
/// callers should build one [`Prober`] and reuse it.
///
/// # Errors
///
/// Returns [`CheckinError::MalformedFingerprint`] before any network call,
/// [`CheckinError::Config`] for an invalid config, otherwise
/// [`CheckinError::Transport`] or [`CheckinError::Decode`].
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> otaprobe_checkin::Result<()> {
/// let config = otaprobe_checkin::ProbeConfig::default();
/// let result = otaprobe_checkin::probe(
///     "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys",
///     Some("Pixel 6"),
///     &config,
/// )
/// .await?;
/// if let Some(update) = &result.update {
///     println!("{}: {}", update.tag_name, update.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn probe(
    fingerprint: &str,
    model_code: Option<&str>,
    config: &ProbeConfig,
) -> Result<ProbeResult> {
    BuildFingerprint::parse(fingerprint)?;
    Prober::new(config.clone())?
        .probe(fingerprint, model_code)
        .await
}
