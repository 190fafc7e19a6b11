//! Access-token lifecycle
//!
//! NoToken → (exchange succeeds / token set) → HasToken → (token cleared) →
//! NoToken. The token is restored from the store once, when the manager is
//! built, and every change is written back before the call returns. There
//! is no refresh; an `InvalidToken` API error means the caller clears the
//! token and runs the authorization flow again.

use std::sync::Arc;

use common::Secret;
use serde::Deserialize;
use tracing::{debug, info};
use tuenti_api::ApiClient;

use crate::constants::{ACCESS_TOKEN_KEY, TOKEN_EXCHANGE_PATH};
use crate::environment::{RequestContext, canonical_url};
use crate::error::{Error, Result};
use crate::storage::{PersistentStore, scoped_key};

/// Successful token exchange response. Extra fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

pub struct AccessTokenManager {
    store: Arc<dyn PersistentStore>,
    key: String,
    token: Option<Secret<String>>,
}

impl AccessTokenManager {
    /// Build a manager for `client_id`, picking up any token a previous
    /// request left in `store`.
    pub fn restore(client_id: &str, store: Arc<dyn PersistentStore>) -> Result<Self> {
        let key = scoped_key(client_id, ACCESS_TOKEN_KEY);
        let token = store
            .get(&key)?
            .filter(|token| !token.is_empty())
            .map(Secret::new);
        if token.is_some() {
            info!(client_id, "restored access token from store");
        }
        Ok(Self { store, key, token })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(Secret::expose_str)
    }

    /// Replace (or with `None`, clear) the token and persist the change.
    ///
    /// An empty string clears the token like `None` does.
    pub fn set_token(&mut self, token: Option<String>) -> Result<()> {
        let token = token.filter(|token| !token.is_empty());
        self.store.set(&self.key, token.as_deref())?;
        match token {
            Some(_) => info!("access token persisted"),
            None => info!("access token cleared"),
        }
        self.token = token.map(Secret::new);
        Ok(())
    }

    /// Trade an authorization code for an access token.
    ///
    /// Any 4xx answer becomes `AuthorizationCodeExchangeFailed`; 5xx and
    /// transport failures propagate unchanged. On failure the current token
    /// (if any) is left alone.
    pub fn exchange_code(&mut self, api: &ApiClient, code: &str, redirect_uri: &str) -> Result<()> {
        debug!(redirect_uri, "exchanging authorization code");
        let client_id = api.identity().client_id.as_str();
        let response = api
            .request(TOKEN_EXCHANGE_PATH, None)?
            .with_client_credentials()
            .post([
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
            ]);

        let body = match response {
            Ok(body) => body,
            Err(tuenti_api::Error::Api(err)) if err.is_client_error() => {
                return Err(Error::AuthorizationCodeExchangeFailed(err.into_details()));
            }
            Err(err) => return Err(err.into()),
        };

        let TokenResponse { access_token } = serde_json::from_value(body)
            .map_err(|e| Error::InvalidTokenResponse(e.to_string()))?;
        if access_token.is_empty() {
            return Err(Error::InvalidTokenResponse("empty access_token".into()));
        }
        info!("authorization code exchanged");
        self.set_token(Some(access_token))
    }

    /// Finish the authorization flow from the platform's redirect back to
    /// the application.
    ///
    /// `code` wins over `error` when both are present. The redirect URI sent
    /// with the exchange is the canonical URL of the current request.
    pub fn complete_from_redirect(
        &mut self,
        api: &ApiClient,
        request: &dyn RequestContext,
    ) -> Result<()> {
        if let Some(code) = request.query_param("code") {
            let redirect_uri = canonical_url(request)?;
            return self.exchange_code(api, &code, &redirect_uri);
        }
        match request.query_param("error") {
            Some(error_type) => Err(Error::AuthorizationRequestFailed {
                error_type,
                description: request.query_param("error_description"),
            }),
            None => Err(Error::AuthorizationCodeNotFound),
        }
    }
}
