use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use super::types::{Check, HttpMethod};

/// Errors a [`Checker`] can report instead of a status code
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe target '{target}': {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("probe target '{0}' has no host")]
    MissingHost(String),

    #[error("request failed: {0}")]
    Transport(String),
}

/// Everything needed to send one probe.
///
/// `hostname` and `path` are the pieces of `url` a [`Checker`] implementor needs
/// when it builds its own request line instead of sending `url` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub hostname: String,
    /// Path including the query string
    pub path: String,
    pub timeout: Duration,
}

impl ProbeRequest {
    /// Parse `protocol://url` into hostname and path, upper-case the verb and
    /// turn the timeout into a duration.
    pub fn from_check(check: &Check) -> Result<Self, ProbeError> {
        let target = check.target();
        let url = Url::parse(&target)
            .map_err(|source| ProbeError::InvalidTarget { target: target.clone(), source })?;

        let hostname = url.host_str().ok_or(ProbeError::MissingHost(target))?.to_string();
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self {
            method: check.method,
            url,
            hostname,
            path,
            timeout: Duration::from_millis(u64::from(check.timeout_seconds) * 1000),
        })
    }
}

/// Sends a probe and reports the status code of whatever came back.
///
/// Implementations must not apply their own deadline; the executor races the
/// call against [`ProbeRequest::timeout`].
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<u16, ProbeError>;
}

/// HTTP/HTTPS checker backed by a shared reqwest client
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> Result<Self, reqwest::Error> {
        // Redirects are reported as-is, a 301 is an answer in its own right
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("uptime-service/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn send(&self, request: &ProbeRequest) -> Result<u16, ProbeError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        debug!(hostname = %request.hostname, path = %request.path, %method, "Sending probe");

        let response = self
            .client
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
