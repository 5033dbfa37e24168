use serde::Deserialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::error::{Result, UpgradeError};
use super::http::HttpClient;
use super::limits::Limits;
use super::platform::Platform;

/// One published release as listed by the releases endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub url: String,
}

impl Asset {
    /// Last path segment of the asset name.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

impl Release {
    /// First asset, in listed order, built for `platform`.
    pub fn matching_asset(&self, platform: &Platform) -> Option<&Asset> {
        let expected = platform.release_prefix(&self.tag);
        debug!("expected release asset {:?}", expected);
        self.assets.iter().find(|asset| {
            let name = asset.base_name();
            debug!("considering release {}", name);
            name.starts_with(&expected)
        })
    }
}

pub(crate) fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Fetch and decode the release list at `url`.
///
/// Transport errors, statuses above 299 and malformed JSON are returned as-is.
/// Most callers want [`fetch_releases`] instead.
pub fn try_fetch_releases(
    client: &HttpClient,
    url: &str,
    limits: &Limits,
) -> Result<Vec<Release>> {
    let body = client.get_bounded(url, None, limits.max_metadata_size)?;
    let rels: Vec<Release> = serde_json::from_reader(body)?;
    Ok(rels)
}

/// Best-effort fetch of the release list.
///
/// Any failure is logged and reported as "no releases", so an unreachable
/// server looks the same as an empty release list. Use [`try_fetch_releases`]
/// to tell the two apart.
pub fn fetch_releases(client: &HttpClient, url: &str, limits: &Limits) -> Vec<Release> {
    match try_fetch_releases(client, url, limits) {
        Ok(rels) => rels,
        Err(e) => {
            info!("couldn't fetch release information: {}", e);
            Vec::new()
        }
    }
}

/// Order two release tags by semantic version precedence.
///
/// A leading `v` is ignored. Tags that do not parse sort below those that do,
/// and among themselves compare as plain strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| semver::Version::parse(s.strip_prefix('v').unwrap_or(s)).ok();
    match (parse(a), parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Pick the newest eligible release that ships an asset for the running platform.
pub fn select_latest_release(current: &str, releases: Vec<Release>) -> Result<Release> {
    select_latest_release_with(&Platform::current(), current, releases, compare_versions)
}

/// Like [`select_latest_release`], for an explicit platform and comparator.
///
/// Releases are sorted newest first with a stable sort, so equal versions keep
/// their listed order. Prereleases are only eligible when `current` is itself a
/// prerelease, which is any version containing a `-`.
pub fn select_latest_release_with<F>(
    platform: &Platform,
    current: &str,
    mut releases: Vec<Release>,
    cmp: F,
) -> Result<Release>
where
    F: Fn(&str, &str) -> Ordering,
{
    if releases.is_empty() {
        return Err(UpgradeError::NoVersionToSelect);
    }

    releases.sort_by(|a, b| cmp(&b.tag, &a.tag));
    let beta = current.contains('-');

    releases
        .into_iter()
        .filter(|rel| beta || !rel.prerelease)
        .find(|rel| rel.matching_asset(platform).is_some())
        .ok_or(UpgradeError::NoReleaseDownload)
}
