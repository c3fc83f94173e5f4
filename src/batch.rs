//! Concurrent probing of several configured devices.
//!
//! Every target gets its own identity and request; one [`Prober`] (and its
//! connection pool) is shared. A failing target is reported in its own
//! [`ProbeOutcome`] and never affects the others.

use std::path::{Path, PathBuf};

use otaprobe_checkin::{CheckinTransport, ProbeResult, Prober};

use crate::config::Target;
use crate::error::{OtaError, Result};

/// Result of probing one target.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub target: Target,
    pub result: Result<ProbeResult>,
}

/// Probe every target concurrently.
///
/// # Pipeline
///
/// 1. Fan out one probe per target with [`futures_util::future::join_all`]
/// 2. Log per-target failures at warn level
/// 3. Return outcomes in target order
///
/// When `debug_dir` is set, each decoded response is dumped there (see
/// [`probe_target`]).
pub async fn probe_all<T: CheckinTransport>(
    prober: &Prober<T>,
    targets: Vec<Target>,
    debug_dir: Option<&Path>,
) -> Vec<ProbeOutcome> {
    let futures: Vec<_> = targets
        .into_iter()
        .map(|target| async move {
            let result = probe_target(prober, &target, debug_dir).await;
            ProbeOutcome { target, result }
        })
        .collect();

    let outcomes = futures_util::future::join_all(futures).await;

    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => {
                tracing::debug!(
                    config = %outcome.target.name,
                    found = result.found,
                    "probe succeeded"
                );
            }
            Err(err) => {
                tracing::warn!(config = %outcome.target.name, error = %err, "probe failed");
            }
        }
    }

    outcomes
}

/// Probe a single target.
///
/// With `debug_dir`, the decoded settings are written to
/// `debug_checkin_response_<name>.json`, or the raw body to
/// `debug_checkin_response_<name>_error.bin` when it does not decode.
/// Dump failures are logged, not returned.
///
/// # Errors
///
/// Returns [`OtaError::Checkin`] if the probe fails.
pub async fn probe_target<T: CheckinTransport>(
    prober: &Prober<T>,
    target: &Target,
    debug_dir: Option<&Path>,
) -> Result<ProbeResult> {
    let identity = prober.identity(&target.fingerprint, target.model.as_deref())?;
    tracing::info!(
        config = %target.name,
        device = identity.device_label(),
        fingerprint = %identity.fingerprint(),
        "checking for updates"
    );

    let Some(dir) = debug_dir else {
        return Ok(prober.probe_identity(&identity).await?);
    };

    let body = prober.fetch(&identity).await?;
    let response = match otaprobe_checkin::decode(&body) {
        Ok(response) => response,
        Err(err) => {
            write_dump(&error_dump_path(dir, &target.name), &body);
            return Err(OtaError::Checkin(err));
        }
    };

    let dump = serde_json::json!({
        "name": target.name,
        "fingerprint": identity.fingerprint().serialize(),
        "android_id": response.android_id(),
        "time_msec": response.time_msec(),
        "settings": response.settings(),
    });
    match serde_json::to_vec_pretty(&dump) {
        Ok(json) => write_dump(&dump_path(dir, &target.name), &json),
        Err(e) => tracing::warn!(error = %e, "cannot serialize debug dump"),
    }

    Ok(otaprobe_checkin::resolve(
        identity.fingerprint(),
        response.entries(),
        identity.device_label(),
    ))
}

/// Path of the decoded-response dump for `name`.
pub fn dump_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("debug_checkin_response_{name}.json"))
}

/// Path of the raw-body dump for `name`.
pub fn error_dump_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("debug_checkin_response_{name}_error.bin"))
}

fn write_dump(path: &Path, bytes: &[u8]) {
    match std::fs::write(path, bytes) {
        Ok(()) => tracing::info!(path = %path.display(), "debug checkin response saved"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot save debug dump"),
    }
}
