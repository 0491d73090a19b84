// Shared transport configuration for building the portal's reqwest::Client.
//
// Redirects are never followed: the session layer treats an unexpected
// redirect on an API call as a server hiccup. Cookies go through the
// session's `CookieJar`, installed as the client's cookie provider.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;

use crate::error::Error;
use crate::session::CookieJar;

/// Production portal root.
pub const DEFAULT_BASE_URL: &str = "https://mytotalconnectcomfort.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one portal client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl TransportConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Settings for the production portal.
    pub fn production() -> Result<Self, Error> {
        Ok(Self::new(Url::parse(DEFAULT_BASE_URL)?))
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` that stores cookies in `jar`.
    pub fn build_client(&self, jar: Arc<CookieJar>) -> Result<reqwest::Client, Error> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("tcc-api/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(headers)
            .cookie_provider(jar)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
