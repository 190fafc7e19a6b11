//! HTTP transport seam
//!
//! [`Transport`] executes one fully assembled [`HttpRequest`]. The default
//! [`ReqwestTransport`] uses a blocking reqwest client; tests and host
//! frameworks plug in their own implementation.

use std::str::FromStr;
use std::time::Duration;

use common::Secret;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

/// Extra header sent with every request (from the `[transport]` config table).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeaderInjection {
    pub name: String,
    pub value: String,
}

/// Caller-supplied transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportOptions {
    /// Whole-request timeout; none by default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
}

impl TransportOptions {
    /// Add the custom headers to `headers`.
    ///
    /// `User-Agent` and `Authorization` are owned by the request builder and
    /// are never overridden; invalid names or values are skipped.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        for injection in &self.headers {
            let name = match HeaderName::from_str(&injection.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            if name == USER_AGENT || name == AUTHORIZATION {
                warn!(header = %injection.name, "refusing to override reserved header");
                continue;
            }
            let value = match HeaderValue::from_str(&injection.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %injection.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            headers.insert(name, value);
        }
    }
}

/// HTTP Basic credentials (`client_id:client_secret`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Secret<String>,
}

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, query string included
    pub url: String,
    pub headers: HeaderMap,
    pub basic_auth: Option<BasicAuth>,
    /// `application/x-www-form-urlencoded` body, only when there are body parameters
    pub body: Option<String>,
}

/// What came back from the server.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Network-level failure (connection refused, timeout, DNS, TLS).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error [{code}]: {message}")]
pub struct TransportError {
    /// Transport-native error code, e.g. `connect` or `timeout`
    pub code: String,
    pub message: String,
}

impl TransportError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else if e.is_redirect() {
            "redirect"
        } else if e.is_body() {
            "body"
        } else if e.is_decode() {
            "decode"
        } else if e.is_builder() {
            "builder"
        } else {
            "request"
        };
        Self::new(code, e.to_string())
    }
}

/// Executes a single HTTP exchange. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client honouring the configured timeouts.
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(secs) = options.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = options.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers);
        if let Some(auth) = request.basic_auth {
            builder = builder.basic_auth(auth.username, Some(auth.password.expose_str()));
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text()?;
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
