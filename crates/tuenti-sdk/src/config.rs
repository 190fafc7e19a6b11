//! Configuration types and loading
//!
//! Config precedence: CLI arg > `TUENTI_CONFIG` env var > `tuenti.toml`.
//! The client secret comes from the `TUENTI_CLIENT_SECRET` env var or
//! `client_secret_file`, never from the TOML itself.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::Deserialize;
use tuenti_api::TransportOptions;
use url::Url;

use crate::constants::{CLIENT_SECRET_ENV, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

/// Application registration and transport settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// REST API root, e.g. `https://api.tuenti.com`
    pub rest_api_base_url: String,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    /// Root of the authorization dialog; needed only to build authorization URLs
    #[serde(default)]
    pub dialog_api_base_url: Option<String>,
    #[serde(default)]
    pub transport: TransportOptions,
}

impl Config {
    /// Programmatic construction with default transport options.
    pub fn new(
        rest_api_base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
    ) -> common::Result<Self> {
        let config = Self {
            rest_api_base_url: rest_api_base_url.into(),
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            client_secret_file: None,
            dialog_api_base_url: None,
            transport: TransportOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_dialog_api_base_url(mut self, url: impl Into<String>) -> common::Result<Self> {
        self.dialog_api_base_url = Some(url.into());
        self.validate()?;
        Ok(self)
    }

    pub fn with_transport_options(mut self, options: TransportOptions) -> common::Result<Self> {
        self.transport = options;
        self.validate()?;
        Ok(self)
    }

    /// Load configuration from a TOML file, then resolve the client secret.
    ///
    /// Client secret resolution order:
    /// 1. `TUENTI_CLIENT_SECRET` env var
    /// 2. `client_secret_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            config.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client_secret = Some(Secret::new(secret));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve config file path from CLI arg or `TUENTI_CONFIG` env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn validate(&self) -> common::Result<()> {
        validate_base_url("rest_api_base_url", &self.rest_api_base_url)?;
        if let Some(ref dialog) = self.dialog_api_base_url {
            validate_base_url("dialog_api_base_url", dialog)?;
        }

        if self.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        match self.client_secret {
            Some(ref secret) if !secret.is_empty() => {}
            _ => {
                return Err(common::Error::Config(format!(
                    "client_secret is required; set {CLIENT_SECRET_ENV} or client_secret_file"
                )));
            }
        }

        if self.transport.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.transport.connect_timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// An http(s) URL with a host and optional path; no port, credentials,
/// query or fragment.
fn validate_base_url(field: &str, value: &str) -> common::Result<()> {
    let invalid = |reason: &str| {
        common::Error::Config(format!("invalid {field}: {value:?} {reason}"))
    };

    if value.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    let url = Url::parse(value).map_err(|e| invalid(&format!("is not a URL ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("must use http or https"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("has no host"));
    }
    // Url drops default ports, so look at the raw authority as well
    let authority = value
        .split_once("://")
        .map_or("", |(_, rest)| rest.split('/').next().unwrap_or_default());
    if url.port().is_some() || authority.contains(':') {
        return Err(invalid("must not specify a port"));
    }
    if authority.contains('@') {
        return Err(invalid("must not contain credentials"));
    }
    // Request URLs are base + path; a fragment would hide the path
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not have a query or fragment"));
    }
    Ok(())
}
