//! Checkin request construction.
//!
//! A [`CheckinIdentity`] describes the device being impersonated; [`build`]
//! turns it into the encoded [`CheckinRequestPayload`] sent on the wire.
//! The identity always checks in anonymously (android id `0`), which the
//! server treats as a brand-new device and answers with a full settings
//! list instead of a deduplicated no-op.

use prost::Message;
use rand::Rng;

use crate::config::ProbeConfig;
use crate::error::CheckinError;
use crate::fingerprint::BuildFingerprint;
use crate::proto::{AndroidBuildProto, AndroidCheckinProto, AndroidCheckinRequest};

/// Digest a device sends on its very first checkin (`1-` + SHA-1 of nothing).
pub const FIRST_CHECKIN_DIGEST: &str = "1-da39a3ee5e6b4b0d3255bfef95601890afd80709";

/// Checkin type discriminator requesting settings and system update info.
pub const CHECKIN_TYPE_SYSTEM_UPDATE: i32 = 2;

/// Checkin protocol version.
const PROTOCOL_VERSION: i32 = 3;

/// Hardware identifiers a physical device would report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIds {
    /// 15-digit, Luhn-valid IMEI.
    pub imei: String,
    /// Device serial number.
    pub serial_number: String,
    /// Wifi MAC address, 12 lowercase hex digits without separators.
    pub wifi_mac: String,
}

impl HardwareIds {
    /// Generate a fresh random set of identifiers.
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    /// Generate identifiers from the given RNG.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut digits: Vec<u8> = (0..14).map(|_| rng.gen_range(0..10)).collect();
        digits.push(luhn_check_digit(&digits));
        let imei = digits.iter().map(|d| char::from(b'0' + d)).collect();

        const SERIAL_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let serial_number = (0..12)
            .map(|_| char::from(SERIAL_CHARS[rng.gen_range(0..SERIAL_CHARS.len())]))
            .collect();

        let wifi_mac = (0..6)
            .map(|_| format!("{:02x}", rng.gen::<u8>()))
            .collect();

        Self {
            imei,
            serial_number,
            wifi_mac,
        }
    }
}

/// Luhn check digit for a digit sequence (each element `0..=9`).
fn luhn_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// The device a probe impersonates. Created fresh per probe, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinIdentity {
    fingerprint: BuildFingerprint,
    model_code: Option<String>,
    android_id: i64,
    hardware_ids: Option<HardwareIds>,
}

impl CheckinIdentity {
    /// Anonymous identity for `fingerprint`, optionally reporting a model code.
    ///
    /// A blank model code is treated as absent.
    pub fn new(fingerprint: BuildFingerprint, model_code: Option<String>) -> Self {
        Self {
            fingerprint,
            model_code: model_code
                .map(|m| m.trim().to_owned())
                .filter(|m| !m.is_empty()),
            android_id: 0,
            hardware_ids: None,
        }
    }

    /// Parse `fingerprint` and build an anonymous identity from it.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::MalformedFingerprint`] if the fingerprint is invalid.
    pub fn parse(fingerprint: &str, model_code: Option<&str>) -> Result<Self, CheckinError> {
        let fingerprint = BuildFingerprint::parse(fingerprint)?;
        Ok(Self::new(fingerprint, model_code.map(str::to_owned)))
    }

    /// Attach hardware identifiers to report alongside the build.
    pub fn with_hardware_ids(mut self, ids: HardwareIds) -> Self {
        self.hardware_ids = Some(ids);
        self
    }

    /// The build being reported.
    pub fn fingerprint(&self) -> &BuildFingerprint {
        &self.fingerprint
    }

    /// The model code, if one was supplied.
    pub fn model_code(&self) -> Option<&str> {
        self.model_code.as_deref()
    }

    /// Android id placeholder; always `0` (unregistered device).
    pub fn android_id(&self) -> i64 {
        self.android_id
    }

    /// Hardware identifiers, if attached.
    pub fn hardware_ids(&self) -> Option<&HardwareIds> {
        self.hardware_ids.as_ref()
    }

    /// Human-facing device label: the model code, else the device codename.
    pub fn device_label(&self) -> &str {
        self.model_code().unwrap_or_else(|| self.fingerprint.device())
    }
}

/// Encoded checkin request, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinRequestPayload {
    body: Vec<u8>,
    user_agent: String,
}

impl CheckinRequestPayload {
    /// Encoded `AndroidCheckinRequest` bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// User-Agent header to send with the body.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Build the encoded checkin request for `identity`.
pub fn build(identity: &CheckinIdentity, config: &ProbeConfig) -> CheckinRequestPayload {
    let message = build_message(identity, config);
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| dalvik_user_agent(identity));

    tracing::trace!(
        fingerprint = %identity.fingerprint(),
        bytes = message.encoded_len(),
        "built checkin request"
    );

    CheckinRequestPayload {
        body: message.encode_to_vec(),
        user_agent,
    }
}

/// Build the typed checkin request message for `identity`.
pub fn build_message(identity: &CheckinIdentity, config: &ProbeConfig) -> AndroidCheckinRequest {
    let fingerprint = identity.fingerprint();

    let build = AndroidBuildProto {
        id: Some(fingerprint.serialize()),
        timestamp: Some(0),
        device: Some(fingerprint.device().to_owned()),
        model: identity.model_code().map(str::to_owned),
        ..Default::default()
    };

    let checkin = AndroidCheckinProto {
        build: Some(build),
        last_checkin_msec: Some(0),
        roaming: Some("WIFI::".to_owned()),
        user_number: Some(0),
        device_type: Some(CHECKIN_TYPE_SYSTEM_UPDATE),
        voice_capable: Some(false),
        network_type: Some("WIFI".to_owned()),
        ..Default::default()
    };

    let mut request = AndroidCheckinRequest {
        id: Some(identity.android_id()),
        digest: Some(FIRST_CHECKIN_DIGEST.to_owned()),
        checkin: Some(checkin),
        locale: Some(config.locale.clone()),
        time_zone: Some(config.time_zone.clone()),
        version: Some(PROTOCOL_VERSION),
        mac_addr_type: vec!["wifi".to_owned()],
        fragment: Some(0),
        user_serial_number: Some(0),
        fetch_system_updates: Some(1),
        unknown30: Some(0),
        ..Default::default()
    };

    if let Some(ids) = identity.hardware_ids() {
        request.imei = Some(ids.imei.clone());
        request.serial_number = Some(ids.serial_number.clone());
        request.mac_addr = vec![ids.wifi_mac.clone()];
    }

    request
}

/// The User-Agent a stock Android device sends for this identity.
pub fn dalvik_user_agent(identity: &CheckinIdentity) -> String {
    let fingerprint = identity.fingerprint();
    format!(
        "Dalvik/2.1.0 (Linux; U; Android {}; {} Build/{})",
        fingerprint.release(),
        identity.device_label(),
        fingerprint.build_id()
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use rand::SeedableRng;

    const FINGERPRINT: &str =
        "Infinix/X6833B-GL/Infinix-X6833B:13/TP1A.220624.014/231204V1158:user/release-keys";

    fn deterministic_config() -> ProbeConfig {
        ProbeConfig {
            randomize_hardware_ids: false,
            ..Default::default()
        }
    }

    #[test]
    fn embeds_full_fingerprint_and_device() {
        let identity = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        let message = build_message(&identity, &deterministic_config());
        let build = message.checkin.as_ref().and_then(|c| c.build.as_ref()).expect("build");
        assert_eq!(build.id.as_deref(), Some(FINGERPRINT));
        assert_eq!(build.device.as_deref(), Some("Infinix-X6833B"));
        assert_eq!(build.timestamp, Some(0));
    }

    #[test]
    fn model_code_fills_build_model() {
        let identity = CheckinIdentity::parse(FINGERPRINT, Some("X6833B")).expect("identity");
        let message = build_message(&identity, &deterministic_config());
        let build = message.checkin.as_ref().and_then(|c| c.build.as_ref()).expect("build");
        assert_eq!(build.model.as_deref(), Some("X6833B"));
    }

    #[test]
    fn absent_or_blank_model_code_leaves_model_unset() {
        for model in [None, Some("  ")] {
            let identity = CheckinIdentity::parse(FINGERPRINT, model).expect("identity");
            assert!(identity.model_code().is_none());
            let message = build_message(&identity, &deterministic_config());
            let build = message.checkin.as_ref().and_then(|c| c.build.as_ref()).expect("build");
            assert!(build.model.is_none());
        }
    }

    #[test]
    fn requests_system_updates_anonymously() {
        let identity = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        let message = build_message(&identity, &deterministic_config());
        assert_eq!(message.id, Some(0));
        assert_eq!(message.digest.as_deref(), Some(FIRST_CHECKIN_DIGEST));
        assert_eq!(message.fetch_system_updates, Some(1));
        assert_eq!(message.version, Some(3));
        let checkin = message.checkin.expect("checkin");
        assert_eq!(checkin.device_type, Some(CHECKIN_TYPE_SYSTEM_UPDATE));
        assert_eq!(checkin.roaming.as_deref(), Some("WIFI::"));
    }

    #[test]
    fn locale_and_time_zone_come_from_config() {
        let identity = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        let config = ProbeConfig {
            locale: "de-DE".into(),
            time_zone: "Europe/Berlin".into(),
            ..deterministic_config()
        };
        let message = build_message(&identity, &config);
        assert_eq!(message.locale.as_deref(), Some("de-DE"));
        assert_eq!(message.time_zone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn no_hardware_ids_without_attachment() {
        let identity = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        let message = build_message(&identity, &deterministic_config());
        assert!(message.imei.is_none());
        assert!(message.serial_number.is_none());
        assert!(message.mac_addr.is_empty());
    }

    #[test]
    fn hardware_ids_are_embedded_when_attached() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let ids = HardwareIds::random_with(&mut rng);
        let identity = CheckinIdentity::parse(FINGERPRINT, None)
            .expect("identity")
            .with_hardware_ids(ids.clone());
        let message = build_message(&identity, &deterministic_config());
        assert_eq!(message.imei, Some(ids.imei));
        assert_eq!(message.serial_number, Some(ids.serial_number));
        assert_eq!(message.mac_addr, vec![ids.wifi_mac]);
    }

    #[test]
    fn random_imei_is_luhn_valid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let ids = HardwareIds::random_with(&mut rng);
            assert_eq!(ids.imei.len(), 15);
            let digits: Vec<u8> = ids.imei.bytes().map(|b| b - b'0').collect();
            assert_eq!(luhn_check_digit(&digits[..14]), digits[14]);
            assert_eq!(ids.wifi_mac.len(), 12);
            assert!(ids.wifi_mac.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn luhn_known_value() {
        // 49015420323751 -> check digit 8
        let digits = [4, 9, 0, 1, 5, 4, 2, 0, 3, 2, 3, 7, 5, 1];
        assert_eq!(luhn_check_digit(&digits), 8);
    }

    #[test]
    fn deterministic_payload_for_same_identity() {
        let identity = CheckinIdentity::parse(FINGERPRINT, Some("X6833B")).expect("identity");
        let config = deterministic_config();
        assert_eq!(build(&identity, &config), build(&identity, &config));
    }

    #[test]
    fn dalvik_user_agent_uses_model_then_device() {
        let with_model = CheckinIdentity::parse(FINGERPRINT, Some("X6833B")).expect("identity");
        assert_eq!(
            dalvik_user_agent(&with_model),
            "Dalvik/2.1.0 (Linux; U; Android 13; X6833B Build/TP1A.220624.014)"
        );
        let without = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        assert!(dalvik_user_agent(&without).contains("; Infinix-X6833B Build/"));
    }

    #[test]
    fn custom_user_agent_overrides_dalvik() {
        let identity = CheckinIdentity::parse(FINGERPRINT, None).expect("identity");
        let config = ProbeConfig {
            user_agent: Some("CustomAgent/1.0".into()),
            ..deterministic_config()
        };
        assert_eq!(build(&identity, &config).user_agent(), "CustomAgent/1.0");
    }

    #[test]
    fn malformed_fingerprint_is_rejected() {
        let err = CheckinIdentity::parse("not-a-fingerprint", None).unwrap_err();
        assert!(matches!(err, CheckinError::MalformedFingerprint(_)));
    }
}
