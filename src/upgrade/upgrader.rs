use super::error::Result;
use super::http::{HttpClient, Transport};
use super::limits::Limits;
use super::platform::Platform;
use super::release::{Release, compare_versions, fetch_releases, select_latest_release_with};
use super::signature::Verifier;

/// The collaborators one upgrade run needs, built once and passed around.
///
/// An `Upgrader` performs no locking. Two upgrades of the same binary at the
/// same time race on the target and its `.old` backup, so callers must make
/// sure only one runs at a time.
#[derive(Debug, Clone)]
pub struct Upgrader {
    pub(crate) client: HttpClient,
    pub(crate) platform: Platform,
    pub(crate) verifier: Verifier,
    pub(crate) limits: Limits,
}

impl Upgrader {
    /// Production setup: host platform, compiled-in key, default limits.
    pub fn new(transport: &Transport) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(transport)?,
            platform: Platform::current(),
            verifier: Verifier::embedded()?,
            limits: Limits::default(),
        })
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Best-effort release list; failures come back as an empty list.
    pub fn fetch_releases(&self, url: &str) -> Vec<Release> {
        fetch_releases(&self.client, url, &self.limits)
    }

    /// Fetch the release list and pick the newest one usable from `current`.
    pub fn latest_release(&self, url: &str, current: &str) -> Result<Release> {
        let rels = self.fetch_releases(url);
        select_latest_release_with(&self.platform, current, rels, compare_versions)
    }
}
