//! otaprobe: discovers Android OTA packages through Google's checkin service.
//!
//! The probing engine lives in the [`otaprobe_checkin`] crate. This crate
//! wraps it for unattended use:
//! - **Config**: YAML device files, or an ad-hoc fingerprint
//! - **Batch**: several devices probed concurrently over one connection pool
//! - **Store**: latest results per device in `update_info.json`
//! - **Download**: streaming package download with length verification
//! - **Metadata**: target build read from the package with range requests

pub mod batch;
pub mod config;
pub mod download;
pub mod error;
pub mod metadata;
pub mod store;

pub use batch::{ProbeOutcome, probe_all, probe_target};
pub use config::{DeviceConfig, Target};
pub use error::{OtaError, Result};
pub use store::{UpdateRecord, UpdateStore};
