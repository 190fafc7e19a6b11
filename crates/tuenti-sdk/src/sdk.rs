//! Application-facing entry point

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::debug;
use tuenti_api::{ApiClient, ApiRequest, ClientIdentity, ReqwestTransport, Transport};
use tuenti_context::{Claims, SignedContext};

use crate::authorize::build_authorization_url;
use crate::config::Config;
use crate::constants::CONTEXT_FIELD;
use crate::environment::RequestContext;
use crate::error::{Error, Result};
use crate::storage::PersistentStore;
use crate::token::AccessTokenManager;

/// One application's view of the platform for the current HTTP request.
///
/// Build one per incoming request: the signed context and the redirect
/// parameters are read from `request`, the access token from `store`.
pub struct Tuenti {
    api: ApiClient,
    tokens: AccessTokenManager,
    request: Arc<dyn RequestContext>,
    dialog_api_base_url: Option<String>,
    context: OnceLock<SignedContext>,
}

impl Tuenti {
    /// Build with the default reqwest transport.
    pub fn new(
        config: Config,
        store: Arc<dyn PersistentStore>,
        request: Arc<dyn RequestContext>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.transport).map_err(tuenti_api::Error::from)?;
        Self::with_transport(config, Arc::new(transport), store, request)
    }

    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn PersistentStore>,
        request: Arc<dyn RequestContext>,
    ) -> Result<Self> {
        config.validate()?;
        let Config {
            rest_api_base_url,
            client_id,
            client_secret,
            dialog_api_base_url,
            transport: options,
            ..
        } = config;
        let client_secret = client_secret
            .ok_or_else(|| common::Error::Config("client_secret is required".into()))?;

        let tokens = AccessTokenManager::restore(&client_id, store)?;
        let api = ApiClient::new(
            rest_api_base_url,
            ClientIdentity::new(client_id, client_secret),
            options,
            transport,
        );
        debug!(
            base_url = api.base_url(),
            client_id = %api.identity().client_id,
            has_access_token = tokens.has_token(),
            "SDK ready"
        );

        Ok(Self {
            api,
            tokens,
            request,
            dialog_api_base_url,
            context: OnceLock::new(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.api.identity().client_id
    }

    pub fn api_client(&self) -> &ApiClient {
        &self.api
    }

    /// Start a request for `path`, authenticated with the stored access
    /// token unless another method is selected.
    pub fn api(&self, path: &str) -> Result<ApiRequest<'_>> {
        Ok(self.api.request(path, self.tokens.token())?)
    }

    pub fn has_access_token(&self) -> bool {
        self.tokens.has_token()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.token()
    }

    /// Replace or clear the stored access token, e.g. after the API
    /// rejected it with `InvalidToken`.
    pub fn set_access_token(&mut self, token: Option<String>) -> Result<()> {
        self.tokens.set_token(token)
    }

    pub fn exchange_authorization_code(&mut self, code: &str, redirect_uri: &str) -> Result<()> {
        self.tokens.exchange_code(&self.api, code, redirect_uri)
    }

    /// Handle the platform's redirect back after the authorization dialog.
    pub fn complete_authorization(&mut self) -> Result<()> {
        self.tokens.complete_from_redirect(&self.api, self.request.as_ref())
    }

    /// Verified signed context posted with this request. Verified on first
    /// use; later calls reuse the outcome.
    pub fn signed_context(&self) -> &SignedContext {
        self.context.get_or_init(|| {
            let raw = self.request.form_field(CONTEXT_FIELD);
            let identity = self.api.identity();
            let context = SignedContext::parse(
                raw.as_deref(),
                &identity.client_id,
                identity.client_secret.expose_str().as_bytes(),
                self.request.now(),
            );
            debug!(valid = context.is_valid(), "signed context verified");
            context
        })
    }

    /// Custom fields of the signed context.
    pub fn context_fields(&self) -> Result<&Claims> {
        Ok(self.signed_context().custom_fields()?)
    }

    pub fn context_field(&self, name: &str) -> Result<Option<&Value>> {
        Ok(self.signed_context().field(name)?)
    }

    /// Dialog URL to send the user to for authorization. Needs
    /// `dialog_api_base_url` in the config.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        scopes: &[&str],
    ) -> Result<String> {
        let dialog = self.dialog_api_base_url.as_deref().ok_or_else(|| {
            common::Error::Config("dialog_api_base_url is required to build authorization URLs".into())
        })?;
        Ok(build_authorization_url(
            dialog,
            self.client_id(),
            redirect_uri,
            state,
            scopes,
        ))
    }
}
