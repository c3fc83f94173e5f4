//! Persisted probe results (`update_info.json`).
//!
//! Maps a configuration name to the latest known result for it, so release
//! automation can tell whether an update is new since the last run. A failed
//! probe never overwrites a known result with `found: false`; it only
//! records the error and when it happened.
//!
//! Records this crate cannot interpret (older layouts, hand edits) load with
//! no result rather than failing the whole store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use otaprobe_checkin::ProbeResult;
use serde::Serialize;
use serde_json::Value;

use crate::error::{OtaError, Result};

/// Default store file name, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "update_info.json";

/// Stored state for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRecord {
    /// Latest successful probe result, flattened into the record.
    #[serde(flatten)]
    pub result: Option<ProbeResult>,
    /// When the configuration was last probed.
    pub timestamp: DateTime<Utc>,
    /// Error of the last probe, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UpdateRecord {
    /// Read one stored record leniently.
    ///
    /// A missing or malformed `timestamp` becomes the Unix epoch. The result
    /// is `None` unless the record parses as a consistent [`ProbeResult`];
    /// `found: false` next to an `error` marks a failed probe, not an
    /// up-to-date device.
    pub fn from_json(value: Value) -> Self {
        let timestamp = value
            .get("timestamp")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let result = serde_json::from_value::<ProbeResult>(value)
            .ok()
            .filter(|r| r.found == r.update.is_some())
            .filter(|r| r.found || error.is_none());
        Self {
            result,
            timestamp,
            error,
        }
    }
}

/// The whole store file.
#[derive(Debug, Clone)]
pub struct UpdateStore {
    path: PathBuf,
    records: BTreeMap<String, UpdateRecord>,
}

impl UpdateStore {
    /// Load the store at `path`. A missing or empty file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Store`] if the file exists but cannot be read or
    /// parsed; callers must not silently replace a store they cannot read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw: BTreeMap<String, Value> = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                OtaError::Store(format!("cannot parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(OtaError::Store(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        let records: BTreeMap<String, UpdateRecord> = raw
            .into_iter()
            .map(|(name, value)| {
                let claims_found = value.get("found") == Some(&Value::Bool(true));
                let record = UpdateRecord::from_json(value);
                if claims_found && record.result.is_none() {
                    tracing::warn!(
                        config = %name,
                        "stored update not understood, treated as unknown"
                    );
                }
                (name, record)
            })
            .collect();
        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "loaded update store"
        );
        Ok(Self { path, records })
    }

    /// Path the store is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&UpdateRecord> {
        self.records.get(name)
    }

    /// All records, ordered by name.
    pub fn records(&self) -> impl Iterator<Item = (&str, &UpdateRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` when `result` is a found update whose tag differs from
    /// the tag stored for `name`.
    pub fn is_new(&self, name: &str, result: &ProbeResult) -> bool {
        let Some(tag) = result.tag_name() else {
            return false;
        };
        let previous = self
            .get(name)
            .and_then(|r| r.result.as_ref())
            .and_then(ProbeResult::tag_name);
        previous != Some(tag)
    }

    /// Store a successful probe result, replacing the previous one.
    pub fn record_success(&mut self, name: &str, result: ProbeResult) {
        self.records.insert(
            name.to_owned(),
            UpdateRecord {
                result: Some(result),
                timestamp: Utc::now(),
                error: None,
            },
        );
    }

    /// Store a failed probe, keeping the previous result untouched.
    pub fn record_failure(&mut self, name: &str, error: &str) {
        let timestamp = Utc::now();
        let record = self.records.entry(name.to_owned()).or_insert(UpdateRecord {
            result: None,
            timestamp,
            error: None,
        });
        record.timestamp = timestamp;
        record.error = Some(error.to_owned());
    }

    /// Persist the store, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Store`] if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                OtaError::Store(format!(
                    "cannot create store directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| OtaError::Store(format!("cannot serialize update store: {e}")))?;

        std::fs::write(&self.path, json).map_err(|e| {
            OtaError::Store(format!(
                "cannot write update store to {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), "saved update store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use otaprobe_checkin::{FoundUpdate, PackageKind};

    fn found(tag: &str) -> ProbeResult {
        ProbeResult::found(FoundUpdate {
            title: format!("Update {tag}"),
            tag_name: tag.to_owned(),
            device: "Pixel 6".into(),
            description: "Fixes".into(),
            url: format!("https://example.com/{tag}.zip"),
            size: Some(1024),
            size_approximate: false,
            fingerprint: None,
            package_kind: PackageKind::Incremental,
        })
    }

    fn empty_store() -> UpdateStore {
        UpdateStore {
            path: PathBuf::from("unused.json"),
            records: BTreeMap::new(),
        }
    }

    #[test]
    fn is_new_without_history() {
        assert!(empty_store().is_new("oriole", &found("8671607")));
    }

    #[test]
    fn is_new_only_when_tag_changes() {
        let mut store = empty_store();
        store.record_success("oriole", found("8671607"));
        assert!(!store.is_new("oriole", &found("8671607")));
        assert!(store.is_new("oriole", &found("8750000")));
    }

    #[test]
    fn not_found_is_never_new() {
        assert!(!empty_store().is_new("oriole", &ProbeResult::not_found()));
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut store = empty_store();
        store.record_success("oriole", found("8671607"));
        store.record_failure("oriole", "transport error: timed out");

        let record = store.get("oriole").expect("record");
        assert_eq!(
            record.result.as_ref().and_then(ProbeResult::tag_name),
            Some("8671607")
        );
        assert_eq!(record.error.as_deref(), Some("transport error: timed out"));
    }

    #[test]
    fn failure_without_history_has_no_result() {
        let mut store = empty_store();
        store.record_failure("oriole", "decode error: empty checkin response");
        let json = serde_json::to_value(store.get("oriole").expect("record")).expect("json");
        assert!(json.get("found").is_none());
        assert!(json.get("error").is_some());
    }

    #[test]
    fn success_clears_error() {
        let mut store = empty_store();
        store.record_failure("oriole", "boom");
        store.record_success("oriole", found("8671607"));
        assert!(store.get("oriole").expect("record").error.is_none());
    }

    #[test]
    fn not_found_replaces_found_update() {
        let mut store = empty_store();
        store.record_success("oriole", found("8671607"));
        store.record_success("oriole", ProbeResult::not_found());
        let record = store.get("oriole").expect("record");
        assert_eq!(record.result, Some(ProbeResult::not_found()));
    }

    #[test]
    fn legacy_record_without_tag_loads_without_result() {
        let record = UpdateRecord::from_json(serde_json::json!({
            "device": "Pixel 6",
            "found": true,
            "timestamp": "2024-06-01T12:00:00.123456+00:00",
            "title": "SQ3A.220705.003",
            "description": "Fixes",
            "size": "412 MB",
            "url": "https://android.googleapis.com/packages/ota-api/package/abc.zip"
        }));
        assert!(record.result.is_none());
        assert_eq!(record.timestamp.to_rfc3339(), "2024-06-01T12:00:00.123456+00:00");
    }

    #[test]
    fn legacy_failure_record_is_not_an_up_to_date_result() {
        let record = UpdateRecord::from_json(serde_json::json!({
            "device": "Pixel 6",
            "found": false,
            "timestamp": "2024-06-01T12:00:00+00:00",
            "error": "Update check failed or returned no data"
        }));
        assert!(record.result.is_none());
        assert_eq!(
            record.error.as_deref(),
            Some("Update check failed or returned no data")
        );
    }

    #[test]
    fn record_without_timestamp_defaults_to_epoch() {
        let record = UpdateRecord::from_json(serde_json::json!({ "found": false }));
        assert_eq!(record.result, Some(ProbeResult::not_found()));
        assert_eq!(record.timestamp, DateTime::<Utc>::default());
    }

    #[test]
    fn record_serialises_flat() {
        let mut store = empty_store();
        store.record_success("oriole", found("8671607"));
        let json = serde_json::to_value(store.get("oriole").expect("record")).expect("json");
        assert_eq!(json["found"], true);
        assert_eq!(json["tag_name"], "8671607");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("error").is_none());
    }
}
