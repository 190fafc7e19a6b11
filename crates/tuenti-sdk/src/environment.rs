//! Read-only view of the incoming HTTP request

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Request data the SDK needs from the host application's web layer.
pub trait RequestContext: Send + Sync {
    /// Decoded query-string parameter.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Decoded form field from a POST body.
    fn form_field(&self, name: &str) -> Option<String>;

    /// Server metadata such as `HTTP_HOST` or `REQUEST_URI`.
    fn server_var(&self, name: &str) -> Option<String>;

    /// Current unix time in whole seconds.
    fn now(&self) -> u64 {
        unix_now()
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Plain-value [`RequestContext`] filled in by the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    server: HashMap<String, String>,
    now: Option<u64>,
}

impl RequestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }

    pub fn with_server_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(name.into(), value.into());
        self
    }

    /// Pin the clock instead of reading system time.
    pub fn at(mut self, now: u64) -> Self {
        self.now = Some(now);
        self
    }
}

impl RequestContext for RequestData {
    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    fn form_field(&self, name: &str) -> Option<String> {
        self.form.get(name).cloned()
    }

    fn server_var(&self, name: &str) -> Option<String> {
        self.server.get(name).cloned()
    }

    fn now(&self) -> u64 {
        self.now.unwrap_or_else(unix_now)
    }
}

/// URL of the current request as the platform redirects to it:
/// `https://<HTTP_HOST><REQUEST_URI>` with the query string dropped.
pub fn canonical_url(request: &dyn RequestContext) -> Result<String> {
    let host = request
        .server_var("HTTP_HOST")
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::MissingRequestData("HTTP_HOST".into()))?;
    let uri = request
        .server_var("REQUEST_URI")
        .ok_or_else(|| Error::MissingRequestData("REQUEST_URI".into()))?;
    let path = uri.split_once('?').map_or(uri.as_str(), |(path, _)| path);
    Ok(format!("https://{host}{path}"))
}
