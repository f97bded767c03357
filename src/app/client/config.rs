//! reqwest client settings for dataset downloads
//!
//! Every request carries the browser-like headers the NHTSA file server
//! expects. Connect and read timeouts are always finite so a dead server
//! can never hang a fetch.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client, ClientBuilder};

use crate::constants::http;
use crate::errors::DownloadResult;

/// Network settings for [`HttpDownloader`](super::HttpDownloader)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Longest wait for a single read; a stalled body fails after this
    pub read_timeout: Duration,
    /// Redirect hops followed before giving up
    pub max_redirects: usize,
    pub tcp_keepalive: Option<Duration>,
    pub tcp_nodelay: bool,
    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_per_host: usize,
    /// Honour `HTTP(S)_PROXY` from the environment
    pub use_system_proxy: bool,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: http::CONNECT_TIMEOUT,
            read_timeout: http::READ_TIMEOUT,
            max_redirects: http::MAX_REDIRECTS,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            use_system_proxy: true,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build the shared reqwest client
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` if the TLS backend cannot be initialized
    pub fn build_http_client(&self) -> DownloadResult<Client> {
        let builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(request_headers())
            .redirect(redirect::Policy::limited(self.max_redirects))
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout);

        Ok(self.apply_pool_settings(builder).build()?)
    }

    fn apply_pool_settings(&self, builder: ClientBuilder) -> ClientBuilder {
        let builder = builder
            .tcp_nodelay(self.tcp_nodelay)
            .tcp_keepalive(self.tcp_keepalive)
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_per_host);

        if self.use_system_proxy {
            builder
        } else {
            builder.no_proxy()
        }
    }
}

fn request_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(http::ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(http::ACCEPT_LANGUAGE));
    headers
}
