//! OTA package download.
//!
//! Streams the package to `<dir>/<file name>.part` with a progress bar,
//! checks the byte count against the advertised size, then renames the
//! file into place. A truncated download never leaves a file under the
//! final name.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use otaprobe_checkin::FoundUpdate;
use tokio::io::AsyncWriteExt;

use crate::error::{OtaError, Result};

/// File name for the package at `url`: the last path segment, or
/// `<tag>.zip` when the URL has none.
pub fn package_file_name(url: &str, tag_name: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_owned))
        })
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| format!("{tag_name}.zip"))
}

/// Download the package of `update` into `dir`.
///
/// Returns the final path. An existing file whose length matches the exact
/// advertised size is reused without downloading. Sizes rounded from unit
/// strings are never compared byte for byte; the server's `content-length`
/// is checked instead.
///
/// # Errors
///
/// Returns [`OtaError::Download`] on HTTP failure or a length mismatch, and
/// [`OtaError::Io`] if the file cannot be written. The `.part` file is
/// removed on every error.
pub async fn download_update(
    client: &reqwest::Client,
    update: &FoundUpdate,
    dir: &Path,
    show_progress: bool,
) -> Result<PathBuf> {
    let filename = package_file_name(&update.url, &update.tag_name);
    let dest = dir.join(&filename);
    let exact_size = update.exact_size();

    if let (Some(expected), Ok(meta)) = (exact_size, std::fs::metadata(&dest)) {
        if meta.is_file() && meta.len() == expected {
            tracing::info!(path = %dest.display(), "package already downloaded");
            return Ok(dest);
        }
    }

    let response = client
        .get(&update.url)
        .send()
        .await
        .map_err(|e| OtaError::Download(format!("failed to download {filename}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OtaError::Download(format!(
            "failed to download {filename}: HTTP {status}"
        )));
    }

    let content_length = response.content_length();
    if let (Some(expected), Some(advertised)) = (exact_size, content_length) {
        if expected != advertised {
            return Err(OtaError::Download(format!(
                "{filename}: server sends {advertised} bytes, checkin reported {expected}"
            )));
        }
    }
    let expected = exact_size.or(content_length);

    let pb = if show_progress {
        ProgressBar::new(expected.or(update.size).unwrap_or(0))
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template(
        "  {msg} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} ETA {eta}",
    ) {
        pb.set_style(style);
    }
    pb.set_message(filename.clone());

    tokio::fs::create_dir_all(dir).await?;
    let tmp = dir.join(format!("{filename}.part"));

    let written = match write_package(response, &tmp, &dest, expected, &pb).await {
        Ok(written) => written,
        Err(err) => {
            pb.abandon();
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp.display(),
                        error = %e,
                        "cannot remove partial download"
                    );
                }
            }
            return Err(err);
        }
    };
    pb.finish();

    tracing::info!(path = %dest.display(), bytes = written, "package downloaded");
    Ok(dest)
}

/// Stream the body into `tmp`, verify its length, then move it to `dest`.
async fn write_package(
    response: reqwest::Response,
    tmp: &Path,
    dest: &Path,
    expected: Option<u64>,
    pb: &ProgressBar,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(tmp).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| OtaError::Download(format!("download read error: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = expected {
        if written != expected {
            return Err(OtaError::Download(format!(
                "{}: expected {expected} bytes, got {written}",
                dest.display()
            )));
        }
    }

    tokio::fs::rename(tmp, dest).await?;
    Ok(written)
}
