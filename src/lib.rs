//! Crate entry point for **stupgrade**.
//!
//! This library finds, downloads, verifies and installs new releases of a
//! deployed `syncthing` binary, and backs the `stupgrade` CLI.
//! The [`upgrade`] module holds the pipeline: release selection, archive
//! extraction, signature verification and the on-disk swap.
//!
//! Nothing here retries, restarts the upgraded process, or serializes
//! concurrent upgrades; those are the caller's job.

mod paths;
mod progress;
mod settings;
pub mod upgrade;

/// Re-export commonly used types and commands so they can be accessed from `stupgrade::*`.
pub use paths::stupgrade_home;
pub use settings::{Config, DEFAULT_RELEASES_URL, load_config, parse_config};
pub use upgrade::{
    Release, UpgradeError, Upgrader, cmd_check, cmd_upgrade, cmd_upgrade_url,
    select_latest_release,
};
