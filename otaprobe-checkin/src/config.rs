//! Probe configuration with sensible defaults.
//!
//! [`ProbeConfig`] controls where checkin requests go, how long a probe may
//! take, and the device-profile defaults embedded in every request.

use crate::error::CheckinError;

/// Google's checkin endpoint.
pub const DEFAULT_CHECKIN_ENDPOINT: &str = "https://android.googleapis.com/checkin";

/// Configuration for a checkin probe.
///
/// Use [`Default::default()`] for the settings the live service expects, or
/// construct with field overrides (tests point `endpoint` at a mock server).
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Checkin endpoint URL.
    pub endpoint: String,
    /// Upper bound for the whole request/response exchange, in seconds.
    pub timeout_seconds: u64,
    /// Locale reported in the request.
    pub locale: String,
    /// Time zone reported in the request.
    pub time_zone: String,
    /// Custom User-Agent. If `None`, a Dalvik User-Agent is derived from the
    /// fingerprint and model code of each request.
    pub user_agent: Option<String>,
    /// Attach a random IMEI, serial number and wifi MAC to each request, as a
    /// real device would. When `false` those fields are left unset and the
    /// request bytes depend only on the identity.
    pub randomize_hardware_ids: bool,
    /// Gzip the request body and send `content-encoding: gzip`, as devices do.
    pub compress_requests: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHECKIN_ENDPOINT.to_owned(),
            timeout_seconds: 30,
            locale: "en-US".to_owned(),
            time_zone: "America/New_York".to_owned(),
            user_agent: None,
            randomize_hardware_ids: true,
            compress_requests: true,
        }
    }
}

impl ProbeConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `endpoint` must be an absolute `http` or `https` URL
    /// - `timeout_seconds` must be greater than 0
    /// - `locale` and `time_zone` must not be empty
    pub fn validate(&self) -> Result<(), CheckinError> {
        let endpoint = url::Url::parse(&self.endpoint).map_err(|e| {
            CheckinError::Config(format!("invalid endpoint {:?}: {e}", self.endpoint))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CheckinError::Config(format!(
                "endpoint must use http or https, got {}",
                endpoint.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(CheckinError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.locale.trim().is_empty() {
            return Err(CheckinError::Config("locale must not be empty".into()));
        }
        if self.time_zone.trim().is_empty() {
            return Err(CheckinError::Config("time_zone must not be empty".into()));
        }
        Ok(())
    }

    /// The configured timeout as a [`std::time::Duration`].
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}
