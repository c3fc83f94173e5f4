//! Error types for the otaprobe-checkin crate.
//!
//! Every variant is fatal for the single probe that produced it. None of
//! them means "no update": an up-to-date device is a successful
//! [`ProbeResult`](crate::types::ProbeResult) with `found == false`.

/// Errors that can occur while probing the checkin service.
#[derive(Debug, thiserror::Error)]
pub enum CheckinError {
    /// The build fingerprint does not have the
    /// `brand/product/device:release/id/incremental:type/tags` shape.
    #[error("malformed fingerprint: {0}")]
    MalformedFingerprint(String),

    /// The checkin request could not be delivered: connection failure,
    /// timeout, or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The checkin response is not a well-formed checkin response message.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid probe configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for otaprobe-checkin results.
pub type Result<T> = std::result::Result<T, CheckinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_malformed_fingerprint() {
        let err = CheckinError::MalformedFingerprint("expected 6 '/' groups, got 3".into());
        assert_eq!(
            err.to_string(),
            "malformed fingerprint: expected 6 '/' groups, got 3"
        );
    }

    #[test]
    fn display_transport() {
        let err = CheckinError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn display_decode() {
        let err = CheckinError::Decode("truncated message".into());
        assert_eq!(err.to_string(), "decode error: truncated message");
    }

    #[test]
    fn display_config() {
        let err = CheckinError::Config("timeout_seconds must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "config error: timeout_seconds must be greater than 0"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CheckinError>();
    }
}
