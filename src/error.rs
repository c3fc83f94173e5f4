//! Error types for the otaprobe host.

use otaprobe_checkin::CheckinError;

/// Top-level error type for configuration, probing, persistence and downloads.
#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    /// Device configuration could not be loaded or is incomplete.
    #[error("config error: {0}")]
    Config(String),

    /// The checkin probe failed.
    #[error(transparent)]
    Checkin(#[from] CheckinError),

    /// The persisted update state could not be read or written.
    #[error("store error: {0}")]
    Store(String),

    /// OTA package download failed or was truncated.
    #[error("download error: {0}")]
    Download(String),

    /// The package metadata could not be fetched or holds no target build.
    #[error("package metadata error: {0}")]
    Metadata(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OtaError>;
