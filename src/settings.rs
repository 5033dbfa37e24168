use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::time::Duration;

use crate::paths::paths;
use crate::upgrade::{ProxyPolicy, READ_TIMEOUT, Transport};

/// Release list consulted when the config does not name one.
pub const DEFAULT_RELEASES_URL: &str = "https://upgrades.syncthing.net/meta.json";

/// Settings loaded from `config.toml`.
///
/// Every key is optional; a missing file means all defaults.
///
/// Example TOML:
/// ```toml
/// releases_url  = "https://api.github.com/repos/syncthing/syncthing/releases"
/// timeout_secs  = 600
/// proxy         = "none"          # "env" (default), "none" or a proxy URL
/// local_address = "192.0.2.10"
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub releases_url: String,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub local_address: Option<IpAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            timeout_secs: None,
            proxy: None,
            local_address: None,
        }
    }
}

impl Config {
    /// Transport settings described by this config.
    ///
    /// # Errors
    /// - Returns an error if `timeout_secs` is zero.
    pub fn transport(&self) -> Result<Transport> {
        let timeout = match self.timeout_secs {
            Some(0) => bail!("timeout_secs must be positive"),
            Some(secs) => Duration::from_secs(secs),
            None => READ_TIMEOUT,
        };
        let proxy = match self.proxy.as_deref() {
            None | Some("env") => ProxyPolicy::Environment,
            Some("none") => ProxyPolicy::Disabled,
            Some(url) => ProxyPolicy::Explicit(url.to_string()),
        };
        Ok(Transport {
            timeout,
            proxy,
            local_address: self.local_address,
            ..Transport::default()
        })
    }
}

/// Parse a config from TOML text.
pub fn parse_config(txt: &str) -> Result<Config> {
    toml::from_str(txt).context("failed to parse config.toml")
}

/// Load `config.toml` from the stupgrade home directory.
///
/// # Errors
/// - Returns an error if the file exists but cannot be read or parsed.
///
/// # Notes
/// - This always resolves the path using [`paths()`].
/// - A missing file is not an error and yields [`Config::default`].
pub fn load_config() -> Result<Config> {
    let p = paths()?;
    match fs::read_to_string(&p.config) {
        Ok(txt) => parse_config(&txt).with_context(|| format!("in {}", p.config.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("cannot read config: {}", p.config.display())),
    }
}
