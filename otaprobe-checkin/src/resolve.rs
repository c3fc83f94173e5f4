//! Update resolution: decide which decoded entry, if any, applies to the
//! probed build.
//!
//! # Selection
//!
//! | Entry shape | Applies when |
//! |---|---|
//! | source fingerprint present | source equals the request, or the target crosses a major release (classified full) |
//! | target fingerprint only | full package crossing a major release |
//! | no fingerprints | always (addressed to the requesting build) |
//!
//! Entries whose target is the requested build itself never apply. When more
//! than one entry survives, the one with the greatest numeric target
//! incremental wins; equal keys keep server order.

use std::cmp::Ordering;

use crate::fingerprint::BuildFingerprint;
use crate::text::sanitize_tag;
use crate::types::{FoundUpdate, PackageKind, ProbeResult, UpdateEntry};

/// Resolve decoded entries against the requesting build.
///
/// `device` is the label reported in the result (model code, or codename).
/// Returns [`ProbeResult::not_found`] when nothing applies; that is the
/// ordinary "up to date" outcome, not an error.
pub fn resolve<'a, I>(request: &BuildFingerprint, entries: I, device: &str) -> ProbeResult
where
    I: IntoIterator<Item = &'a UpdateEntry>,
{
    let candidates: Vec<(&UpdateEntry, PackageKind)> = entries
        .into_iter()
        .filter_map(|entry| applicable_kind(request, entry).map(|kind| (entry, kind)))
        .collect();

    let Some(&(chosen, kind)) = candidates
        .iter()
        .reduce(|best, next| match rank(next.0).cmp(&rank(best.0)) {
            Ordering::Greater => next,
            _ => best,
        })
    else {
        tracing::debug!(fingerprint = %request, "no applicable update");
        return ProbeResult::not_found();
    };

    let tag_name = derive_tag(chosen);
    if candidates.len() > 1 {
        tracing::warn!(
            fingerprint = %request,
            candidates = candidates.len(),
            chosen = %tag_name,
            "ambiguous checkin response, picked greatest incremental"
        );
    }

    let title = chosen
        .title
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| tag_name.clone());

    ProbeResult::found(FoundUpdate {
        title,
        tag_name,
        device: device.to_owned(),
        description: chosen.description.clone().unwrap_or_default(),
        url: chosen.download_url.clone(),
        size: chosen.size_bytes,
        size_approximate: chosen.size_approximate,
        fingerprint: chosen.target_fingerprint.as_ref().map(BuildFingerprint::serialize),
        package_kind: kind,
    })
}

/// The effective package kind if `entry` applies to `request`, else `None`.
fn applicable_kind(request: &BuildFingerprint, entry: &UpdateEntry) -> Option<PackageKind> {
    let crosses_major = entry
        .target_fingerprint
        .as_ref()
        .is_some_and(|target| target.crosses_major_release(request));

    if entry.target_fingerprint.as_ref() == Some(request) {
        tracing::debug!(index = entry.index, "entry targets the requested build, skipped");
        return None;
    }

    match (&entry.source_fingerprint, &entry.target_fingerprint) {
        (Some(source), _) if source == request => Some(if crosses_major {
            PackageKind::Full
        } else {
            PackageKind::Incremental
        }),
        (Some(source), _) => {
            if crosses_major {
                Some(PackageKind::Full)
            } else {
                tracing::debug!(
                    index = entry.index,
                    source = %source,
                    "entry for a different source build discarded"
                );
                None
            }
        }
        (None, Some(_)) => {
            (entry.package_kind == PackageKind::Full && crosses_major).then_some(PackageKind::Full)
        }
        (None, None) => Some(entry.package_kind),
    }
}

/// Tie-break key: numeric incrementals above non-numeric, above none.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Rank<'a> {
    Missing,
    Text(&'a str),
    /// Significant digit count, then the digits themselves.
    Number(usize, &'a str),
}

fn rank(entry: &UpdateEntry) -> Rank<'_> {
    let Some(target) = &entry.target_fingerprint else {
        return Rank::Missing;
    };
    let incremental = target.incremental();
    if incremental.bytes().all(|b| b.is_ascii_digit()) {
        let digits = incremental.trim_start_matches('0');
        Rank::Number(digits.len(), digits)
    } else {
        Rank::Text(incremental)
    }
}

/// Stable release tag for an entry.
fn derive_tag(entry: &UpdateEntry) -> String {
    let from_target = entry
        .target_fingerprint
        .as_ref()
        .map(|t| sanitize_tag(t.incremental()));
    let from_title = || entry.title.as_deref().map(sanitize_tag);
    let from_url = || url_file_stem(&entry.download_url).map(sanitize_tag);

    [from_target, from_title(), from_url()]
        .into_iter()
        .flatten()
        .find(|tag| !tag.is_empty())
        .unwrap_or_else(|| "update".to_owned())
}

fn url_file_stem(raw: &str) -> Option<&str> {
    let path = raw.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    (!stem.is_empty()).then_some(stem)
}
