//! Target build lookup from OTA package metadata.
//!
//! Every OTA zip carries `META-INF/com/android/metadata`, a `key=value` file
//! whose `post-build` line is the fingerprint of the build it installs. The
//! checkin service rarely names that build, so it is read from the package.
//! Only the zip directory and the metadata entry are fetched, with HTTP
//! range requests.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use otaprobe_checkin::{BuildFingerprint, FoundUpdate};
use zip::result::ZipError;

use crate::error::{OtaError, Result};

/// Path of the metadata entry inside an OTA package.
pub const METADATA_ENTRY: &str = "META-INF/com/android/metadata";

const POST_BUILD_KEY: &str = "post-build";

/// Bytes per range request. The first request takes the package tail, which
/// must hold the end-of-directory record and its longest possible comment.
const RANGE_CHUNK: u64 = 128 * 1024;

const MAX_RANGE_REQUESTS: usize = 16;

/// Largest body accepted from a server that ignores `Range`.
const MAX_FULL_BODY: u64 = 16 * 1024 * 1024;

/// Fill `update.fingerprint` from the package metadata when the checkin
/// response did not name the target build.
///
/// Failures are logged and leave the update untouched.
pub async fn fill_target_fingerprint(client: &reqwest::Client, update: &mut FoundUpdate) {
    if update.fingerprint.is_some() {
        return;
    }
    match fetch_target_fingerprint(client, &update.url).await {
        Ok(fingerprint) => {
            tracing::info!(%fingerprint, "target build read from package metadata");
            update.fingerprint = Some(fingerprint);
        }
        Err(err) => {
            tracing::warn!(url = %update.url, error = %err, "cannot read package metadata");
        }
    }
}

/// Read the `post-build` fingerprint from the package at `url`.
///
/// # Errors
///
/// Returns [`OtaError::Download`] if the package cannot be fetched, and
/// [`OtaError::Metadata`] if it is not a zip, has no metadata entry, or the
/// entry names no valid fingerprint.
pub async fn fetch_target_fingerprint(client: &reqwest::Client, url: &str) -> Result<String> {
    let tail = fetch_range(client, url, &format!("bytes=-{RANGE_CHUNK}")).await?;
    let mut package = RemotePackage::new(tail.total);
    package.insert(tail)?;

    for _ in 0..MAX_RANGE_REQUESTS {
        match read_metadata(&mut package) {
            Ok(text) => return post_build(&text),
            Err(MetadataRead::Missing(offset)) => {
                let end = package.fetch_end(offset);
                tracing::debug!(offset, end, "fetching package range");
                let body = fetch_range(client, url, &format!("bytes={offset}-{end}")).await?;
                package.insert(body)?;
            }
            Err(MetadataRead::Invalid(err)) => {
                return Err(OtaError::Metadata(format!("unreadable package: {err}")));
            }
        }
    }

    Err(OtaError::Metadata(format!(
        "metadata not reached after {MAX_RANGE_REQUESTS} range requests"
    )))
}

/// Extract and validate the `post-build` value of a metadata file.
///
/// # Errors
///
/// Returns [`OtaError::Metadata`] if the line is missing or malformed.
pub fn post_build(metadata: &str) -> Result<String> {
    let raw = metadata
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == POST_BUILD_KEY)
        .map(|(_, value)| value.trim())
        .ok_or_else(|| OtaError::Metadata(format!("no {POST_BUILD_KEY} line")))?;

    BuildFingerprint::parse(raw)
        .map(|fp| fp.serialize())
        .map_err(|e| OtaError::Metadata(e.to_string()))
}

enum MetadataRead {
    Missing(u64),
    Invalid(ZipError),
}

fn read_metadata(package: &mut RemotePackage) -> std::result::Result<String, MetadataRead> {
    package.pos = 0;
    let mut archive = zip::ZipArchive::new(&mut *package).map_err(classify)?;
    let mut entry = archive.by_name(METADATA_ENTRY).map_err(classify)?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| classify(ZipError::Io(e)))?;
    Ok(text)
}

fn classify(err: ZipError) -> MetadataRead {
    if let ZipError::Io(io) = &err {
        if let Some(missing) = io.get_ref().and_then(|e| e.downcast_ref::<MissingRange>()) {
            return MetadataRead::Missing(missing.0);
        }
    }
    MetadataRead::Invalid(err)
}

/// One fetched slice of the package.
struct RangeBody {
    start: u64,
    total: u64,
    bytes: Vec<u8>,
}

async fn fetch_range(client: &reqwest::Client, url: &str, range: &str) -> Result<RangeBody> {
    let response = client
        .get(url)
        .header(reqwest::header::RANGE, range)
        .send()
        .await
        .map_err(|e| OtaError::Download(format!("package range request failed: {e}")))?;

    let status = response.status();
    let (start, total) = match status {
        reqwest::StatusCode::PARTIAL_CONTENT => {
            let content_range = response
                .headers()
                .get(reqwest::header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_content_range)
                .ok_or_else(|| {
                    OtaError::Metadata("partial response without a valid content-range".into())
                })?;
            (content_range.0, content_range.2)
        }
        reqwest::StatusCode::OK => match response.content_length() {
            Some(len) if len <= MAX_FULL_BODY => (0, len),
            _ => {
                return Err(OtaError::Metadata(
                    "server ignores range requests for a large package".into(),
                ));
            }
        },
        _ => {
            return Err(OtaError::Download(format!(
                "package range request failed: HTTP {status}"
            )));
        }
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|e| OtaError::Download(format!("package range read error: {e}")))?
        .to_vec();
    Ok(RangeBody {
        start,
        total,
        bytes,
    })
}

/// Parse `bytes <first>-<last>/<total>`.
fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let rest = value.trim().strip_prefix("bytes ")?;
    let (span, total) = rest.split_once('/')?;
    let (first, last) = span.split_once('-')?;
    Some((first.parse().ok()?, last.parse().ok()?, total.parse().ok()?))
}

#[derive(Debug)]
struct MissingRange(u64);

impl fmt::Display for MissingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package bytes at offset {} not fetched", self.0)
    }
}

impl std::error::Error for MissingRange {}

/// A remote package known only through the ranges fetched so far.
///
/// Reads from unfetched bytes fail with [`MissingRange`] so the caller can
/// fetch them and start over. Chunks never start inside another chunk.
struct RemotePackage {
    len: u64,
    chunks: BTreeMap<u64, Vec<u8>>,
    pos: u64,
}

impl RemotePackage {
    fn new(len: u64) -> Self {
        Self {
            len,
            chunks: BTreeMap::new(),
            pos: 0,
        }
    }

    fn insert(&mut self, body: RangeBody) -> Result<()> {
        if body.total != self.len {
            return Err(OtaError::Metadata(format!(
                "package length changed from {} to {}",
                self.len, body.total
            )));
        }
        if !body.bytes.is_empty() {
            self.chunks.insert(body.start, body.bytes);
        }
        Ok(())
    }

    /// Last byte to request when `offset` is missing: one chunk, clipped to
    /// the next fetched chunk and the end of the package.
    fn fetch_end(&self, offset: u64) -> u64 {
        let next = self
            .chunks
            .range(offset..)
            .next()
            .map_or(self.len, |(start, _)| *start);
        offset
            .saturating_add(RANGE_CHUNK)
            .min(next)
            .min(self.len)
            .saturating_sub(1)
    }

    fn available_at(&self, offset: u64) -> Option<&[u8]> {
        let (start, data) = self.chunks.range(..=offset).next_back()?;
        let skip = usize::try_from(offset - start).ok()?;
        data.get(skip..).filter(|rest| !rest.is_empty())
    }
}

impl Read for RemotePackage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }
        let Some(available) = self.available_at(self.pos) else {
            return Err(io::Error::other(MissingRange(self.pos)));
        };
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for RemotePackage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before package start"))?;
        self.pos = target;
        Ok(target)
    }
}
