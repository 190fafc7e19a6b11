//! Entry point for building API requests

use std::sync::Arc;

use common::Secret;

use crate::error::{Error, Result};
use crate::request::ApiRequest;
use crate::transport::{Transport, TransportOptions};

/// The application's OAuth client identity.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// Check a REST resource path: absolute, no trailing slash, segments made of
/// `[0-9a-z_-]` only.
pub fn validate_path(path: &str) -> Result<()> {
    let valid = path.strip_prefix('/').is_some_and(|rest| {
        rest.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        })
    });
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRequestPath(path.to_owned()))
    }
}

/// Shared state for every request against one REST API base URL.
pub struct ApiClient {
    base_url: String,
    identity: ClientIdentity,
    options: TransportOptions,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// `base_url` is expected to be validated already (scheme, host, no query).
    pub fn new(
        base_url: impl Into<String>,
        identity: ClientIdentity,
        options: TransportOptions,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            identity,
            options,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Start a request for `path`. Fails fast on a malformed path, before any
    /// network access.
    ///
    /// `access_token` is what resource-owner authentication will send, if selected.
    pub fn request<'a>(&'a self, path: &str, access_token: Option<&'a str>) -> Result<ApiRequest<'a>> {
        validate_path(path)?;
        Ok(ApiRequest::new(
            self.transport.as_ref(),
            &self.identity,
            &self.options,
            format!("{}{}", self.base_url, path),
            access_token,
        ))
    }
}
