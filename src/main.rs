//! # stupgrade
//!
//! **stupgrade** upgrades a deployed `syncthing` binary in place.
//!
//! Features:
//! - `stupgrade check` shows the newest release this build would move to
//! - `stupgrade upgrade` installs it over the running executable (or `--binary`)
//! - `stupgrade upgrade-url <URL>` installs a specific release archive
//! - `stupgrade home` prints the directory holding `config.toml`
//!
//! Set `RUST_LOG=debug` to see every asset and archive member considered.
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stupgrade::{cmd_check, cmd_upgrade, cmd_upgrade_url, stupgrade_home};
use tracing_subscriber::EnvFilter;

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "stupgrade",
    version,
    about = "stupgrade - signed in-place upgrades for syncthing",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show the latest release available for this platform
    Check,
    /// Upgrade to the latest release
    Upgrade {
        /// Binary to replace (defaults to the running executable)
        #[arg(long)]
        binary: Option<PathBuf>,
    },
    /// Upgrade from a release archive URL
    UpgradeUrl {
        url: String,
        /// Binary to replace (defaults to the running executable)
        #[arg(long)]
        binary: Option<PathBuf>,
    },
    /// Print the stupgrade config directory
    Home,
}

/// CLI entry point.
///
/// Installs the `tracing` subscriber (filtered by `RUST_LOG`, warnings by
/// default), parses arguments and runs the selected subcommand.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Check => cmd_check(),
        Cmd::Upgrade { binary } => cmd_upgrade(binary),
        Cmd::UpgradeUrl { url, binary } => cmd_upgrade_url(&url, binary),
        Cmd::Home => {
            println!("{}", stupgrade_home()?.display());
            Ok(())
        }
    }
}
