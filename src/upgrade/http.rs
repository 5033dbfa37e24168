use reqwest::Proxy;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::io::{Read, Take};
use std::net::IpAddr;
use std::time::Duration;

use super::error::Result;
use super::limits::READ_TIMEOUT;

/// How the client reaches the network when a proxy may be involved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyPolicy {
    /// Honor `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY`.
    #[default]
    Environment,
    Disabled,
    Explicit(String),
}

/// Transport settings shared by the metadata fetch and the archive download.
///
/// Certificate validation is off by default. Some hosts run with stale or
/// missing CA roots, and trust comes from the release signature over the
/// binary rather than from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    pub timeout: Duration,
    pub proxy: ProxyPolicy,
    /// Bind outgoing connections to this local address.
    pub local_address: Option<IpAddr>,
    pub accept_invalid_certs: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            timeout: READ_TIMEOUT,
            proxy: ProxyPolicy::Environment,
            local_address: None,
            accept_invalid_certs: true,
        }
    }
}

/// Blocking HTTP client built once from a [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(transport: &Transport) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("stupgrade"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(transport.timeout)
            .danger_accept_invalid_certs(transport.accept_invalid_certs);
        builder = match &transport.proxy {
            ProxyPolicy::Environment => builder,
            ProxyPolicy::Disabled => builder.no_proxy(),
            ProxyPolicy::Explicit(url) => builder.proxy(Proxy::all(url.as_str())?),
        };
        if let Some(addr) = transport.local_address {
            builder = builder.local_address(addr);
        }

        Ok(Self {
            inner: builder.build()?,
        })
    }

    /// GET `url` and hand back the body, truncated after `limit` bytes.
    ///
    /// Statuses above 299 are errors.
    pub fn get_bounded(
        &self,
        url: &str,
        accept: Option<&str>,
        limit: u64,
    ) -> Result<Take<Response>> {
        let mut req = self.inner.get(url);
        if let Some(accept) = accept {
            req = req.header(ACCEPT, accept);
        }
        let resp = req.send()?.error_for_status()?;
        Ok(resp.take(limit))
    }
}
