//! Checkin response decoding and OTA settings correlation.
//!
//! The checkin response carries a flat GServices settings list. Update
//! metadata is spread over several keys following the
//! `update_<field>[_<n>]` convention; keys sharing the numeric suffix `n`
//! (none means `0`) describe the same package.
//!
//! # Pipeline
//!
//! 1. Decode the protobuf into [`Setting`] pairs (non-UTF-8 pairs skipped)
//! 2. Group OTA keys by correlation index into [`UpdateCluster`]s
//! 3. Convert each cluster into a typed [`UpdateEntry`], dropping clusters
//!    without a URL or with unparseable fingerprints

use std::collections::BTreeMap;

use prost::Message;
use serde::Serialize;

use crate::error::CheckinError;
use crate::fingerprint::BuildFingerprint;
use crate::proto::AndroidCheckinResponse;
use crate::text::{clean_description, tidy_title};
use crate::types::{PackageKind, UpdateEntry};

/// Prefix every OTA setting key starts with.
const UPDATE_KEY_PREFIX: &str = "update_";

/// URL prefix of OTA packages served by Google, used to spot a package URL
/// published under a non-standard key.
pub const OTA_PACKAGE_URL_MARKER: &str = "https://android.googleapis.com/packages/ota";

/// One GServices setting, decoded as UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    /// Setting key.
    pub name: String,
    /// Setting value.
    pub value: String,
}

/// A fully decoded checkin response.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    settings: Vec<Setting>,
    entries: Vec<UpdateEntry>,
    android_id: Option<u64>,
    time_msec: Option<i64>,
}

impl DecodedResponse {
    /// Every UTF-8 setting in server order, OTA-related or not.
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// Update candidates, ordered by correlation index.
    ///
    /// The response is decoded up front, so this can be iterated any number
    /// of times.
    pub fn entries(&self) -> std::slice::Iter<'_, UpdateEntry> {
        self.entries.iter()
    }

    /// Consume the response, keeping only the update candidates.
    pub fn into_entries(self) -> Vec<UpdateEntry> {
        self.entries
    }

    /// Android id assigned by the server, if any.
    pub fn android_id(&self) -> Option<u64> {
        self.android_id
    }

    /// Server time in milliseconds, if reported.
    pub fn time_msec(&self) -> Option<i64> {
        self.time_msec
    }
}

/// Decode a raw checkin response body.
///
/// # Errors
///
/// Returns [`CheckinError::Decode`] if the body is empty or is not a
/// well-formed `AndroidCheckinResponse` (truncated, wrong wire types).
pub fn decode(bytes: &[u8]) -> Result<DecodedResponse, CheckinError> {
    if bytes.is_empty() {
        return Err(CheckinError::Decode("empty checkin response".into()));
    }

    let response = AndroidCheckinResponse::decode(bytes)
        .map_err(|e| CheckinError::Decode(format!("invalid checkin response: {e}")))?;

    let settings: Vec<Setting> = response
        .setting
        .into_iter()
        .filter_map(|s| {
            let name = String::from_utf8(s.name.unwrap_or_default()).ok()?;
            let value = String::from_utf8(s.value.unwrap_or_default()).ok()?;
            Some(Setting { name, value })
        })
        .collect();

    let entries: Vec<UpdateEntry> = correlate(&settings)
        .into_iter()
        .filter_map(UpdateCluster::into_entry)
        .collect();

    tracing::debug!(
        settings = settings.len(),
        entries = entries.len(),
        "decoded checkin response"
    );

    Ok(DecodedResponse {
        settings,
        entries,
        android_id: response.android_id,
        time_msec: response.time_msec,
    })
}

/// Which part of an update a setting key describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Url,
    Title,
    Description,
    Size,
    TargetFingerprint,
    SourceFingerprint,
    PackageKind,
}

impl UpdateField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "url" => Some(Self::Url),
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "size" => Some(Self::Size),
            "target_fingerprint" | "fingerprint" | "post_build" => Some(Self::TargetFingerprint),
            "source_fingerprint" | "pre_build" => Some(Self::SourceFingerprint),
            "package_kind" | "type" => Some(Self::PackageKind),
            _ => None,
        }
    }
}

/// Split an OTA setting key into its field and correlation index.
///
/// `update_url` → `(Url, 0)`, `update_size_2` → `(Size, 2)`. Returns `None`
/// for keys outside the convention or for fields this crate does not use
/// (`update_urgency`, `update_watchdog_frequency`, ...).
pub fn parse_update_key(name: &str) -> Option<(UpdateField, u32)> {
    let rest = name.strip_prefix(UPDATE_KEY_PREFIX)?;
    if let Some(field) = UpdateField::from_name(rest) {
        return Some((field, 0));
    }
    let (field, index) = rest.rsplit_once('_')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((UpdateField::from_name(field)?, index.parse().ok()?))
}

/// Raw settings sharing one correlation index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCluster {
    pub index: u32,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub target_fingerprint: Option<String>,
    pub source_fingerprint: Option<String>,
    pub package_kind: Option<String>,
}

impl UpdateCluster {
    fn slot(&mut self, field: UpdateField) -> &mut Option<String> {
        match field {
            UpdateField::Url => &mut self.url,
            UpdateField::Title => &mut self.title,
            UpdateField::Description => &mut self.description,
            UpdateField::Size => &mut self.size,
            UpdateField::TargetFingerprint => &mut self.target_fingerprint,
            UpdateField::SourceFingerprint => &mut self.source_fingerprint,
            UpdateField::PackageKind => &mut self.package_kind,
        }
    }

    /// Convert into a typed entry.
    ///
    /// Returns `None` (and logs why) when the cluster has no URL or names a
    /// fingerprint that does not parse.
    pub fn into_entry(self) -> Option<UpdateEntry> {
        let index = self.index;
        let Some(download_url) = self.url.filter(|u| !u.trim().is_empty()) else {
            tracing::debug!(index, "update settings without a URL ignored");
            return None;
        };

        let target_fingerprint = parse_fingerprint(index, "target", self.target_fingerprint)?;
        let source_fingerprint = parse_fingerprint(index, "source", self.source_fingerprint)?;

        let size = self.size.as_deref().and_then(|raw| {
            let parsed = parse_size(raw);
            if parsed.is_none() {
                tracing::warn!(index, size = raw, "unparseable update size ignored");
            }
            parsed
        });

        let declared_kind = self.package_kind.as_deref().and_then(|raw| {
            let kind = PackageKind::from_setting(raw);
            if kind.is_none() {
                tracing::warn!(index, kind = raw, "unknown package kind ignored");
            }
            kind
        });
        let package_kind = declared_kind.unwrap_or(if source_fingerprint.is_some() {
            PackageKind::Incremental
        } else {
            PackageKind::Full
        });

        Some(UpdateEntry {
            index,
            target_fingerprint,
            source_fingerprint,
            download_url: download_url.trim().to_owned(),
            size_bytes: size.map(|s| s.bytes),
            size_approximate: size.is_some_and(|s| !s.exact),
            title: self.title.as_deref().map(tidy_title),
            description: self.description.as_deref().map(clean_description),
            package_kind,
        })
    }
}

/// `Some(None)` when absent, `Some(Some(fp))` when valid, `None` when invalid.
fn parse_fingerprint(
    index: u32,
    role: &str,
    raw: Option<String>,
) -> Option<Option<BuildFingerprint>> {
    match raw {
        None => Some(None),
        Some(raw) => match BuildFingerprint::parse(raw.trim()) {
            Ok(fp) => Some(Some(fp)),
            Err(err) => {
                tracing::warn!(index, role, error = %err, "update with malformed fingerprint dropped");
                None
            }
        },
    }
}

/// Group OTA settings by correlation index.
///
/// The first occurrence of a key wins. When no cluster carries an
/// `update_url`, the first non-`update_*` setting whose value is a Google OTA
/// package URL becomes the URL of cluster `0`.
pub fn correlate(settings: &[Setting]) -> Vec<UpdateCluster> {
    let mut clusters: BTreeMap<u32, UpdateCluster> = BTreeMap::new();

    for setting in settings {
        let Some((field, index)) = parse_update_key(&setting.name) else {
            continue;
        };
        let cluster = clusters.entry(index).or_insert_with(|| UpdateCluster {
            index,
            ..Default::default()
        });
        let slot = cluster.slot(field);
        if slot.is_none() {
            *slot = Some(setting.value.clone());
        }
    }

    if !clusters.values().any(|c| c.url.is_some()) {
        if let Some(setting) = settings.iter().find(|s| {
            parse_update_key(&s.name).is_none()
                && s.value.trim_start().starts_with(OTA_PACKAGE_URL_MARKER)
        }) {
            tracing::debug!(key = %setting.name, "OTA URL found under non-standard key");
            clusters.entry(0).or_default().url = Some(setting.value.trim().to_owned());
        }
    }

    clusters.into_values().collect()
}

/// A package size as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportedSize {
    /// Size in bytes.
    pub bytes: u64,
    /// `true` for a plain byte count, `false` for a rounded unit string.
    pub exact: bool,
}

/// Parse a size setting: a plain byte count or a unit string like `"1.2 GB"`.
pub fn parse_size(raw: &str) -> Option<ReportedSize> {
    let raw = raw.trim();
    if let Ok(bytes) = raw.parse::<u64>() {
        return Some(ReportedSize { bytes, exact: true });
    }
    byte_unit::Byte::parse_str(raw, true)
        .ok()
        .map(|b| ReportedSize {
            bytes: b.as_u64(),
            exact: false,
        })
}
