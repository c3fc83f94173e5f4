//! End-to-end tests for the checkin pipeline.
//!
//! A canned checkin response (`fixtures/checkin_response.bin`) is fed
//! through decode and resolve, and stub transports stand in for the
//! network. Nothing here talks to Google.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use otaprobe_checkin::{
    decode, resolve, BuildFingerprint, CheckinError, CheckinRequestPayload, CheckinTransport,
    PackageKind, ProbeConfig, Prober,
};

const FIXTURE: &[u8] = include_bytes!("fixtures/checkin_response.bin");
const REQUEST: &str = "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys";
const EXPECTED_URL: &str = "https://android.googleapis.com/packages/ota-api/package/6f1c0ab2e5f7d9d0d7b2c3e4a5f60718293a4b5c.zip";

/// Returns the fixture for every request.
#[derive(Default)]
struct CannedTransport {
    calls: AtomicUsize,
}

impl CheckinTransport for CannedTransport {
    async fn send(
        &self,
        payload: &CheckinRequestPayload,
        _timeout: Duration,
    ) -> Result<Vec<u8>, CheckinError> {
        assert!(!payload.body().is_empty());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FIXTURE.to_vec())
    }
}

/// Never answers.
struct SilentTransport;

impl CheckinTransport for SilentTransport {
    async fn send(
        &self,
        _payload: &CheckinRequestPayload,
        _timeout: Duration,
    ) -> Result<Vec<u8>, CheckinError> {
        std::future::pending().await
    }
}

/// Fails like a refused connection.
struct FailingTransport;

impl CheckinTransport for FailingTransport {
    async fn send(
        &self,
        _payload: &CheckinRequestPayload,
        _timeout: Duration,
    ) -> Result<Vec<u8>, CheckinError> {
        Err(CheckinError::Transport("connection refused".into()))
    }
}

/// Returns bytes that are not a checkin response.
struct GarbageTransport;

impl CheckinTransport for GarbageTransport {
    async fn send(
        &self,
        _payload: &CheckinRequestPayload,
        _timeout: Duration,
    ) -> Result<Vec<u8>, CheckinError> {
        Ok(FIXTURE[..FIXTURE.len() / 2].to_vec())
    }
}

fn config() -> ProbeConfig {
    ProbeConfig {
        timeout_seconds: 1,
        randomize_hardware_ids: false,
        ..Default::default()
    }
}

#[test]
fn fixture_decodes_and_resolves() {
    let response = decode(FIXTURE).expect("fixture decodes");
    assert_eq!(response.settings().len(), 14);
    assert_eq!(response.entries().count(), 2);
    assert_eq!(response.time_msec(), Some(1_656_979_200_000));

    let request = BuildFingerprint::parse(REQUEST).expect("fingerprint");
    let result = resolve(&request, response.entries(), "Pixel 6");

    assert!(result.found);
    let update = result.update.expect("update");
    assert_eq!(update.url, EXPECTED_URL);
    assert_eq!(update.size, Some(412_316_860));
    assert_eq!(update.tag_name, "8671607");
    assert_eq!(update.title, "SQ3A.220705.003");
    assert_eq!(
        update.description,
        "This update includes the July 2022 security patch.\nBug fixes and improvements."
    );
    assert_eq!(update.package_kind, PackageKind::Incremental);
    assert_eq!(update.device, "Pixel 6");
}

#[test]
fn fixture_has_nothing_for_other_builds() {
    let response = decode(FIXTURE).expect("fixture decodes");
    let other = BuildFingerprint::parse(
        "google/oriole/oriole:12/SQ1A.220105.002/7961164:user/release-keys",
    )
    .expect("fingerprint");
    let result = resolve(&other, response.entries(), "Pixel 6");
    assert!(!result.found);
    assert!(result.update.is_none());
}

#[tokio::test]
async fn prober_runs_full_pipeline() {
    let prober = Prober::with_transport(CannedTransport::default(), config()).expect("prober");
    let result = prober.probe(REQUEST, Some("Pixel 6")).await.expect("probe");
    assert_eq!(result.tag_name(), Some("8671607"));

    let json = serde_json::to_value(&result).expect("serialize");
    assert_eq!(json["found"], true);
    assert_eq!(json["url"], EXPECTED_URL);
    assert_eq!(json["size"], 412_316_860);
    assert_eq!(json["device"], "Pixel 6");
}

#[tokio::test]
async fn device_falls_back_to_codename() {
    let prober = Prober::with_transport(CannedTransport::default(), config()).expect("prober");
    let result = prober.probe(REQUEST, None).await.expect("probe");
    assert_eq!(result.update.expect("update").device, "oriole");
}

#[tokio::test]
async fn malformed_fingerprint_never_reaches_transport() {
    let prober = Prober::with_transport(CannedTransport::default(), config()).expect("prober");
    for raw in [
        "",
        "google/oriole/oriole:12/SQ1D.220205.003",
        "google//oriole:12/SQ1D.220205.003/8069835:user/release-keys",
        "google/oriole/oriole:12/SQ1D.220205.003/8069835:user/release-keys/extra",
    ] {
        let err = prober.probe(raw, None).await.unwrap_err();
        assert!(matches!(err, CheckinError::MalformedFingerprint(_)), "{raw:?}");
    }
}

#[tokio::test]
async fn silent_transport_times_out() {
    let prober = Prober::with_transport(SilentTransport, config()).expect("prober");
    let started = Instant::now();
    let err = prober.probe(REQUEST, None).await.unwrap_err();
    assert!(matches!(err, CheckinError::Transport(_)));
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn transport_failure_is_not_not_found() {
    let prober = Prober::with_transport(FailingTransport, config()).expect("prober");
    let err = prober.probe(REQUEST, None).await.unwrap_err();
    assert!(matches!(err, CheckinError::Transport(_)));
}

#[tokio::test]
async fn corrupted_response_is_decode_error() {
    let prober = Prober::with_transport(GarbageTransport, config()).expect("prober");
    let err = prober.probe(REQUEST, None).await.unwrap_err();
    assert!(matches!(err, CheckinError::Decode(_)));
}

#[tokio::test]
async fn concurrent_probes_share_one_prober() {
    let prober = Prober::with_transport(CannedTransport::default(), config()).expect("prober");
    let (a, b, c) = tokio::join!(
        prober.probe(REQUEST, Some("Pixel 6")),
        prober.probe(REQUEST, Some("Pixel 6 Pro")),
        prober.probe(REQUEST, None),
    );
    assert_eq!(a.expect("a").update.expect("update").device, "Pixel 6");
    assert_eq!(b.expect("b").update.expect("update").device, "Pixel 6 Pro");
    assert_eq!(c.expect("c").update.expect("update").device, "oriole");
    assert_eq!(prober.transport().calls.load(Ordering::SeqCst), 3);
}
