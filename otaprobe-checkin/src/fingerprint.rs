//! Android build fingerprints.
//!
//! A fingerprint names one exact build:
//! `brand/product/device:release/id/incremental:type/tags`, e.g.
//! `google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys`.
//!
//! Two fingerprints are the same build only when their strings are equal.
//! The checkin server is the authority on build identity, so no field-wise
//! or semantic comparison is attempted here.

use std::fmt;
use std::str::FromStr;

use crate::error::CheckinError;

/// Number of `/`-separated groups in a well-formed fingerprint.
const SLASH_GROUPS: usize = 6;

/// A parsed build fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildFingerprint {
    brand: String,
    product: String,
    device: String,
    release: String,
    build_id: String,
    incremental: String,
    build_type: String,
    build_tags: String,
}

impl BuildFingerprint {
    /// Parse a fingerprint string.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::MalformedFingerprint`] if the string does not
    /// split into exactly six `/` groups, the third and fifth groups are not
    /// `a:b` pairs, or any of the eight fields is empty or contains
    /// whitespace.
    pub fn parse(raw: &str) -> Result<Self, CheckinError> {
        let groups: Vec<&str> = raw.split('/').collect();
        if groups.len() != SLASH_GROUPS {
            return Err(CheckinError::MalformedFingerprint(format!(
                "expected {SLASH_GROUPS} '/' groups, got {} in {raw:?}",
                groups.len()
            )));
        }

        let (device, release) = split_pair(groups[2], "device:release", raw)?;
        let (incremental, build_type) = split_pair(groups[4], "incremental:type", raw)?;

        let fields = [
            ("brand", groups[0]),
            ("product", groups[1]),
            ("device", device),
            ("release", release),
            ("build id", groups[3]),
            ("incremental", incremental),
            ("build type", build_type),
            ("build tags", groups[5]),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(CheckinError::MalformedFingerprint(format!(
                    "empty {name} in {raw:?}"
                )));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(CheckinError::MalformedFingerprint(format!(
                    "whitespace in {name} of {raw:?}"
                )));
            }
        }
        let unpaired = [
            ("brand", groups[0]),
            ("product", groups[1]),
            ("build id", groups[3]),
            ("build tags", groups[5]),
        ];
        for (name, value) in unpaired {
            if value.contains(':') {
                return Err(CheckinError::MalformedFingerprint(format!(
                    "unexpected ':' in {name} of {raw:?}"
                )));
            }
        }

        Ok(Self {
            brand: groups[0].to_owned(),
            product: groups[1].to_owned(),
            device: device.to_owned(),
            release: release.to_owned(),
            build_id: groups[3].to_owned(),
            incremental: incremental.to_owned(),
            build_type: build_type.to_owned(),
            build_tags: groups[5].to_owned(),
        })
    }

    /// Render the fingerprint back to its canonical string form.
    ///
    /// Exact inverse of [`BuildFingerprint::parse`].
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Device brand (`google`, `Infinix`, ...).
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Product name.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Device codename.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Android release string (`12`, `8.1.0`, ...).
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Major Android release: the first dot-separated component of
    /// [`release`](Self::release) (`8.1.0` → `8`).
    pub fn major_release(&self) -> &str {
        self.release.split('.').next().unwrap_or(&self.release)
    }

    /// Build identifier (`SQ1D.220205.003`).
    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Incremental version (`8069835`).
    pub fn incremental(&self) -> &str {
        &self.incremental
    }

    /// Build type (`user`, `userdebug`, ...).
    pub fn build_type(&self) -> &str {
        &self.build_type
    }

    /// Build tags (`release-keys`, ...).
    pub fn build_tags(&self) -> &str {
        &self.build_tags
    }

    /// Returns `true` when `other` belongs to a different major Android release.
    pub fn crosses_major_release(&self, other: &BuildFingerprint) -> bool {
        self.major_release() != other.major_release()
    }
}

impl fmt::Display for BuildFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}/{}/{}:{}/{}",
            self.brand,
            self.product,
            self.device,
            self.release,
            self.build_id,
            self.incremental,
            self.build_type,
            self.build_tags
        )
    }
}

impl FromStr for BuildFingerprint {
    type Err = CheckinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_pair<'a>(
    group: &'a str,
    what: &str,
    raw: &str,
) -> Result<(&'a str, &'a str), CheckinError> {
    let mut parts = group.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(left), Some(right), None) => Ok((left, right)),
        _ => Err(CheckinError::MalformedFingerprint(format!(
            "expected {what} in {group:?} of {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const PIXEL: &str = "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys";

    #[test]
    fn parses_all_fields() {
        let fp = BuildFingerprint::parse(PIXEL).expect("valid fingerprint");
        assert_eq!(fp.brand(), "google");
        assert_eq!(fp.product(), "oriole");
        assert_eq!(fp.device(), "oriole");
        assert_eq!(fp.release(), "12");
        assert_eq!(fp.build_id(), "SQ1D.220205.003");
        assert_eq!(fp.incremental(), "8069835");
        assert_eq!(fp.build_type(), "user");
        assert_eq!(fp.build_tags(), "release-keys");
    }

    #[test]
    fn round_trip_is_lossless() {
        let samples = [
            PIXEL,
            "Infinix/X6833B-GL/Infinix-X6833B:13/TP1A.220624.014/231204V1158:user/release-keys",
            "samsung/o1sxxx/o1s:14/UP1A.231005.007/G991BXXSBHXJ1:user/release-keys",
            "motorola/ocean_retail/ocean:8.1.0/OPW28.70-22/7c2d3:userdebug/test-keys",
        ];
        for raw in samples {
            let fp = BuildFingerprint::parse(raw).expect("valid fingerprint");
            assert_eq!(fp.serialize(), raw);
            assert_eq!(fp.to_string(), raw);
        }
    }

    #[test]
    fn from_str_matches_parse() {
        let fp: BuildFingerprint = PIXEL.parse().expect("valid fingerprint");
        assert_eq!(fp, BuildFingerprint::parse(PIXEL).expect("valid fingerprint"));
    }

    #[test]
    fn rejects_wrong_group_count() {
        for raw in [
            "",
            "google/oriole/oriole:12/SQ1D.220205.003/8069835:user",
            "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys/extra",
        ] {
            let err = BuildFingerprint::parse(raw).unwrap_err();
            assert!(matches!(err, CheckinError::MalformedFingerprint(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_missing_colon_pairs() {
        let no_release = "google/oriole/oriole/SQ1D.220205.003/8069835:user/release-keys/x";
        assert!(BuildFingerprint::parse(no_release).is_err());

        let no_type = "google/oriole/oriole:12/SQ1D.220205.003/8069835/release-keys";
        assert!(BuildFingerprint::parse(no_type).is_err());

        let doubled = "google/oriole/oriole:12:1/SQ1D.220205.003/8069835:user/release-keys";
        assert!(BuildFingerprint::parse(doubled).is_err());
    }

    #[test]
    fn rejects_empty_fields() {
        for raw in [
            "/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys",
            "google/oriole/:12/SQ1D.220205.003/8069835:user/release-keys",
            "google/oriole/oriole:/SQ1D.220205.003/8069835:user/release-keys",
            "google/oriole/oriole:12//8069835:user/release-keys",
            "google/oriole/oriole:12/SQ1D.220205.003/:user/release-keys",
            "google/oriole/oriole:12/SQ1D.220205.003/8069835:/release-keys",
            "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/",
        ] {
            let err = BuildFingerprint::parse(raw).unwrap_err();
            assert!(err.to_string().contains("empty"), "{raw}: {err}");
        }
    }

    #[test]
    fn rejects_whitespace() {
        let raw = "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys ";
        let err = BuildFingerprint::parse(raw).unwrap_err();
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn major_release_takes_first_component() {
        let fp = BuildFingerprint::parse(
            "motorola/ocean_retail/ocean:8.1.0/OPW28.70-22/7c2d3:user/release-keys",
        )
        .expect("valid fingerprint");
        assert_eq!(fp.major_release(), "8");
    }

    #[test]
    fn crosses_major_release() {
        let eleven = BuildFingerprint::parse(
            "google/redfin/redfin:11/RQ3A.211001.001/7641976:user/release-keys",
        )
        .expect("valid fingerprint");
        let twelve = BuildFingerprint::parse(PIXEL).expect("valid fingerprint");
        let twelve_later = BuildFingerprint::parse(
            "google/oriole/oriole:12/SQ3A.220705.003/8671607:user/release-keys",
        )
        .expect("valid fingerprint");

        assert!(eleven.crosses_major_release(&twelve));
        assert!(!twelve.crosses_major_release(&twelve_later));
    }
}
