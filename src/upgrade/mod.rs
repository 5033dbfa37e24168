mod archive;
mod error;
mod http;
mod install;
mod limits;
mod platform;
mod release;
mod signature;
mod upgrader;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::ProgressBar;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::time::Duration;

use crate::progress::{ok_style, spinner_style};
use crate::settings::load_config;

pub use archive::{SIGNATURE_NAME, make_executable};
pub use error::UpgradeError;
pub use http::{HttpClient, ProxyPolicy, Transport};
pub use install::backup_path;
pub use limits::{Limits, READ_TIMEOUT};
pub use platform::{ArchiveFormat, Platform};
pub use release::{
    Asset, Release, compare_versions, fetch_releases, select_latest_release,
    select_latest_release_with, try_fetch_releases,
};
pub use signature::{Verifier, signing_digest};
pub use upgrader::Upgrader;

/// Version of the running binary, tagged the way releases are.
pub const CURRENT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

fn upgrader() -> Result<(Upgrader, String)> {
    let cfg = load_config()?;
    let up = Upgrader::new(&cfg.transport()?).context("failed to set up upgrader")?;
    Ok((up, cfg.releases_url))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_message(msg.to_string());
    pb
}

fn resolve_binary(binary: Option<PathBuf>) -> Result<PathBuf> {
    match binary {
        Some(p) => Ok(p),
        None => std::env::current_exe().context("cannot locate the running executable"),
    }
}

/// Print the newest release this binary would upgrade to.
pub fn cmd_check() -> Result<()> {
    let (up, url) = upgrader()?;
    let rel = up
        .latest_release(&url, CURRENT_VERSION)
        .with_context(|| format!("no usable release at {}", url))?;

    if compare_versions(&rel.tag, CURRENT_VERSION) == Ordering::Greater {
        println!(
            "{} {} (running {})",
            "upgrade available:".green(),
            rel.tag.bold(),
            CURRENT_VERSION
        );
    } else {
        println!("already up to date ({})", CURRENT_VERSION);
    }
    Ok(())
}

/// Upgrade the binary to the latest eligible release.
///
/// Process:
/// 1. Fetch the release list from the configured URL.
/// 2. Select the newest release with an asset for this OS/arch.
///    - Prereleases only count when the running version is one.
///    - If it is not newer than the running version → "already up to date".
/// 3. Download the archive and extract the binary and `release.sig`.
/// 4. Verify the signature over the archive name and binary.
/// 5. Move the current binary to `<binary>.old` and the new one into place.
pub fn cmd_upgrade(binary: Option<PathBuf>) -> Result<()> {
    let target = resolve_binary(binary)?;
    let (up, url) = upgrader()?;

    let pb = spinner("resolving latest release…");
    let rel = up
        .latest_release(&url, CURRENT_VERSION)
        .with_context(|| format!("no usable release at {}", url))?;

    if compare_versions(&rel.tag, CURRENT_VERSION) != Ordering::Greater {
        pb.set_style(ok_style());
        pb.finish_with_message(format!("already up to date ({})", CURRENT_VERSION));
        return Ok(());
    }

    pb.set_message(format!("installing {}…", rel.tag));
    up.upgrade_to(&target, &rel)
        .with_context(|| format!("failed to upgrade {}", target.display()))?;

    pb.set_style(ok_style());
    pb.finish_with_message(format!("upgraded to {}", rel.tag));
    Ok(())
}

/// Upgrade the binary from a direct archive URL.
///
/// The last path segment of the URL is the archive name the signature must
/// have been made for.
pub fn cmd_upgrade_url(url: &str, binary: Option<PathBuf>) -> Result<()> {
    let target = resolve_binary(binary)?;
    let (up, _) = upgrader()?;
    let archive_name = url
        .split(['?', '#'])
        .next()
        .and_then(|u| u.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .with_context(|| format!("cannot derive an archive name from {}", url))?;

    let pb = spinner(&format!("downloading {}", archive_name));
    up.upgrade_to_url(archive_name, &target, url)
        .with_context(|| format!("failed to upgrade {}", target.display()))?;

    pb.set_style(ok_style());
    pb.finish_with_message(format!("upgraded from {}", archive_name));
    Ok(())
}
