//! Core types for decoded update candidates and probe results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::BuildFingerprint;

/// Whether an OTA package patches a specific build or replaces the system image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// Complete image; installable regardless of the source build.
    Full,
    /// Patch from exactly one source build to one target build.
    Incremental,
}

impl PackageKind {
    /// Returns the wire/JSON name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }

    /// Parse a server-provided kind, case-insensitively.
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "incremental" | "delta" => Some(Self::Incremental),
            _ => None,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One update candidate correlated from the checkin settings list.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEntry {
    /// Correlation index the entry's settings shared (`0` for unsuffixed keys).
    pub index: u32,
    /// Build the package upgrades to, when the server names it.
    pub target_fingerprint: Option<BuildFingerprint>,
    /// Build the package upgrades from. Absent for full packages.
    pub source_fingerprint: Option<BuildFingerprint>,
    /// Package download URL.
    pub download_url: String,
    /// Package size in bytes, when reported.
    pub size_bytes: Option<u64>,
    /// Whether `size_bytes` was rounded from a unit string such as `"1.2 GB"`.
    pub size_approximate: bool,
    /// Update title (e.g. `"System update"` or a build name).
    pub title: Option<String>,
    /// Cleaned changelog text.
    pub description: Option<String>,
    /// Declared or inferred package kind.
    pub package_kind: PackageKind,
}

/// Details of an applicable update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundUpdate {
    /// Update title as reported by the server.
    pub title: String,
    /// Stable release identifier derived from the target build.
    pub tag_name: String,
    /// Device model code, or the device codename when no model code was given.
    pub device: String,
    /// Cleaned changelog text.
    pub description: String,
    /// Package download URL.
    pub url: String,
    /// Package size in bytes, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Set when `size` was rounded from a unit string and cannot be used to
    /// verify a download byte for byte.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub size_approximate: bool,
    /// Target build fingerprint, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Full or incremental package.
    pub package_kind: PackageKind,
}

impl FoundUpdate {
    /// Size in bytes, only when the server reported an exact byte count.
    pub fn exact_size(&self) -> Option<u64> {
        self.size.filter(|_| !self.size_approximate)
    }
}

/// Outcome of one probe.
///
/// Serialises flat: `{"found": false}` when up to date, or `found` alongside
/// every [`FoundUpdate`] field when an update applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Whether an applicable update exists.
    pub found: bool,
    /// Update details; `Some` exactly when `found` is `true`.
    #[serde(flatten)]
    pub update: Option<FoundUpdate>,
}

impl ProbeResult {
    /// The "device is up to date" result.
    pub fn not_found() -> Self {
        Self {
            found: false,
            update: None,
        }
    }

    /// A result carrying an applicable update.
    pub fn found(update: FoundUpdate) -> Self {
        Self {
            found: true,
            update: Some(update),
        }
    }

    /// Release tag of the found update, if any.
    pub fn tag_name(&self) -> Option<&str> {
        self.update.as_ref().map(|u| u.tag_name.as_str())
    }
}
