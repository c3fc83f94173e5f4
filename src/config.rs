//! Device configuration.
//!
//! Each device is described by a small YAML file:
//!
//! ```yaml
//! oem: google
//! product: oriole
//! device: oriole
//! android_version: 12
//! build_tag: SQ1D.220205.003
//! incremental: 8069835
//! model: Pixel 6
//! ```
//!
//! The file stem names the configuration in the update store.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OtaError, Result};

fn default_build_type() -> String {
    "user".to_owned()
}

fn default_build_tags() -> String {
    "release-keys".to_owned()
}

/// One device/build to probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Brand component of the fingerprint.
    #[serde(deserialize_with = "scalar_string")]
    pub oem: String,
    #[serde(deserialize_with = "scalar_string")]
    pub product: String,
    /// Device codename.
    #[serde(deserialize_with = "scalar_string")]
    pub device: String,
    /// Android release, e.g. `12` or `8.1.0`.
    #[serde(deserialize_with = "scalar_string")]
    pub android_version: String,
    /// Build id, e.g. `SQ1D.220205.003`.
    #[serde(deserialize_with = "scalar_string")]
    pub build_tag: String,
    /// Incremental version of the installed build.
    #[serde(deserialize_with = "scalar_string")]
    pub incremental: String,
    /// Model code reported alongside the fingerprint.
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub model: Option<String>,
    #[serde(default = "default_build_type")]
    pub build_type: String,
    #[serde(default = "default_build_tags")]
    pub build_tags: String,
}

impl DeviceConfig {
    /// Load a device configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Io`] if the file cannot be read, or
    /// [`OtaError::Config`] if it is not a valid device configuration.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| OtaError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse a device configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Config`] for invalid YAML, missing keys or blank values.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| OtaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects blank fingerprint components.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Config`] naming the first blank key.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("oem", &self.oem),
            ("product", &self.product),
            ("device", &self.device),
            ("android_version", &self.android_version),
            ("build_tag", &self.build_tag),
            ("incremental", &self.incremental),
            ("build_type", &self.build_type),
            ("build_tags", &self.build_tags),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((key, _)) => Err(OtaError::Config(format!("`{key}` must not be empty"))),
            None => Ok(()),
        }
    }

    /// Replace the installed incremental version.
    pub fn override_incremental(&mut self, incremental: &str) {
        tracing::info!(
            from = %self.incremental,
            to = incremental,
            "overriding incremental version"
        );
        self.incremental = incremental.to_owned();
    }

    /// Build fingerprint string for this configuration.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}/{}/{}:{}/{}/{}:{}/{}",
            self.oem,
            self.product,
            self.device,
            self.android_version,
            self.build_tag,
            self.incremental,
            self.build_type,
            self.build_tags
        )
    }
}

/// A named probe target: either a loaded config file or an ad-hoc fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Store key.
    pub name: String,
    pub fingerprint: String,
    pub model: Option<String>,
}

impl Target {
    /// Target for a config file, named after the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError`] if the file cannot be loaded or has no usable stem.
    pub fn from_config_file(path: &Path, incremental: Option<&str>) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                OtaError::Config(format!("cannot name configuration {}", path.display()))
            })?
            .to_owned();

        let mut config = DeviceConfig::from_file(path)?;
        if let Some(incremental) = incremental {
            config.override_incremental(incremental);
        }

        Ok(Self {
            name,
            fingerprint: config.fingerprint(),
            model: config.model,
        })
    }

    /// Target for a fingerprint given on the command line, named after its
    /// device codename.
    ///
    /// # Errors
    ///
    /// Returns [`OtaError::Checkin`] if the fingerprint is malformed.
    pub fn ad_hoc(fingerprint: &str, model: Option<&str>) -> Result<Self> {
        let parsed = otaprobe_checkin::BuildFingerprint::parse(fingerprint)?;
        Ok(Self {
            name: parsed.device().to_owned(),
            fingerprint: parsed.serialize(),
            model: model.map(str::to_owned),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
        }
    }
}

/// YAML reads `12` and `8069835` as numbers; fingerprints need the text.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(String::from)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty()))
}
