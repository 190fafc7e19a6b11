//! Single-use authenticated API request
//!
//! Authentication is assembled at send time, in this order:
//! 1. client identifier: `client_id` query parameter
//! 2. client credentials: HTTP Basic `client_id:client_secret`
//! 3. resource owner (default when nothing was selected): the access token,
//!    as `Authorization: Bearer` on its own, or as an `access_token`
//!    parameter (body for POST, query otherwise) next to client credentials

use std::collections::BTreeSet;

use reqwest::Method;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::classify::{ErrorBody, classify};
use crate::client::ClientIdentity;
use crate::error::{Error, Result};
use crate::transport::{BasicAuth, HttpRequest, Transport, TransportOptions};

/// Ways a request can authenticate. Several may be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthMethod {
    ClientIdentifier,
    ClientCredentials,
    ResourceOwner,
}

/// Ordered parameter list; setting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// `application/x-www-form-urlencoded` rendering, in insertion order.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        params.extend(iter);
        params
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Params {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

/// One outbound API call. Sends at most once; every terminal operation on a
/// used request fails with [`Error::RequestAlreadySent`].
pub struct ApiRequest<'a> {
    transport: &'a dyn Transport,
    identity: &'a ClientIdentity,
    options: &'a TransportOptions,
    access_token: Option<&'a str>,
    url: String,
    query: Params,
    body: Params,
    auth_methods: BTreeSet<AuthMethod>,
    sent: bool,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(
        transport: &'a dyn Transport,
        identity: &'a ClientIdentity,
        options: &'a TransportOptions,
        url: String,
        access_token: Option<&'a str>,
    ) -> Self {
        Self {
            transport,
            identity,
            options,
            access_token,
            url,
            query: Params::new(),
            body: Params::new(),
            auth_methods: BTreeSet::new(),
            sent: false,
        }
    }

    pub fn with_client_identifier(&mut self) -> &mut Self {
        self.auth_methods.insert(AuthMethod::ClientIdentifier);
        self
    }

    pub fn with_client_credentials(&mut self) -> &mut Self {
        self.auth_methods.insert(AuthMethod::ClientCredentials);
        self
    }

    pub fn with_access_token(&mut self) -> &mut Self {
        self.auth_methods.insert(AuthMethod::ResourceOwner);
        self
    }

    /// Explicitly selected methods, in assembly order.
    pub fn auth_methods(&self) -> Vec<AuthMethod> {
        self.auth_methods.iter().copied().collect()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// GET with `params` added to the query string.
    pub fn get<I, K, V>(&mut self, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        self.query.extend(params);
        self.send(Method::GET)
    }

    /// POST with `params` form-encoded into the body.
    pub fn post<I, K, V>(&mut self, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ensure_unsent()?;
        self.body.extend(params);
        self.send(Method::POST)
    }

    pub fn put(&mut self) -> Result<Value> {
        self.send(Method::PUT)
    }

    pub fn delete(&mut self) -> Result<Value> {
        self.send(Method::DELETE)
    }

    fn ensure_unsent(&self) -> Result<()> {
        if self.sent {
            return Err(Error::RequestAlreadySent);
        }
        Ok(())
    }

    fn send(&mut self, method: Method) -> Result<Value> {
        self.ensure_unsent()?;
        self.sent = true;

        let request = self.build(method)?;
        debug!(method = %request.method, url = %request.url, "sending API request");

        let response = self.transport.execute(request)?;
        debug!(status = response.status, "API request completed");

        let error_body = if response.status >= 400 {
            ErrorBody::parse(&response.body)
        } else {
            ErrorBody::default()
        };
        if let Some(err) = classify(response.status, &response.headers, &error_body) {
            return Err(err.into());
        }

        decode_body(&response.body)
    }

    fn build(&mut self, method: Method) -> Result<HttpRequest> {
        if self.auth_methods.is_empty() {
            self.auth_methods.insert(AuthMethod::ResourceOwner);
        }
        let client_credentials = self.auth_methods.contains(&AuthMethod::ClientCredentials);

        let mut headers = HeaderMap::new();
        self.options.apply_headers(&mut headers);
        headers.insert(header::USER_AGENT, HeaderValue::from_static(crate::USER_AGENT));

        if self.auth_methods.contains(&AuthMethod::ClientIdentifier) {
            self.query.set("client_id", self.identity.client_id.as_str());
        }

        let basic_auth = client_credentials.then(|| BasicAuth {
            username: self.identity.client_id.clone(),
            password: self.identity.client_secret.clone(),
        });

        if self.auth_methods.contains(&AuthMethod::ResourceOwner) {
            let token = self.access_token.ok_or(Error::AccessTokenNotFound)?;
            if client_credentials {
                if method == Method::POST {
                    self.body.set("access_token", token);
                } else {
                    self.query.set("access_token", token);
                }
            } else {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| Error::MalformedAccessToken)?;
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        let url = if self.query.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, self.query.encode())
        };
        let body = (!self.body.is_empty()).then(|| self.body.encode());

        Ok(HttpRequest {
            method,
            url,
            headers,
            basic_auth,
            body,
        })
    }
}

/// Empty bodies (typical for PUT/DELETE) decode to `null`.
fn decode_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| Error::InvalidResponse(format!("response body is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::header::WWW_AUTHENTICATE;
    use serde_json::json;

    use super::*;
    use crate::client::ApiClient;
    use crate::error::ApiError;
    use crate::testing::RecordingTransport;
    use crate::transport::{HeaderInjection, HttpResponse, TransportError};

    const BASE_URL: &str = "https://tuenti.test";
    const REQUEST_URL: &str = "https://tuenti.test/foo/bar";
    const ACCESS_TOKEN: &str = "Mwn6qi3v0DJADs7Njw1bqG8OnwiYwcFRTks";
    const CLIENT_ID: &str = "KlLsu4GGWqMj0n6w";
    const CLIENT_SECRET: &str = "VYA7e1CVZVBzEhodskoXeBlwjvuc";
    const SUCCESSFUL_RESPONSE: &str = r#"{"total": 100, "items":[{"id":1,"title":"Foo"}]}"#;

    fn api(transport: Arc<RecordingTransport>, options: TransportOptions) -> ApiClient {
        ApiClient::new(
            BASE_URL,
            ClientIdentity::new(CLIENT_ID, CLIENT_SECRET),
            options,
            transport,
        )
    }

    fn no_params() -> [(&'static str, &'static str); 0] {
        []
    }

    fn bearer(request: &HttpRequest) -> Option<&str> {
        request
            .headers
            .get(header::AUTHORIZATION)
            .map(|v| v.to_str().unwrap())
    }

    #[test]
    fn get_sends_query_and_bearer_token() {
        let transport = RecordingTransport::replying(200, SUCCESSFUL_RESPONSE);
        let api = api(transport.clone(), TransportOptions::default());

        let result = api
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .get([("state", "acKhf")])
            .unwrap();

        assert_eq!(result, json!({"total": 100, "items": [{"id": 1, "title": "Foo"}]}));
        let request = transport.only_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, format!("{REQUEST_URL}?state=acKhf"));
        assert_eq!(bearer(&request), Some(format!("Bearer {ACCESS_TOKEN}").as_str()));
        assert_eq!(request.headers[header::USER_AGENT], crate::USER_AGENT);
        assert!(request.basic_auth.is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn post_form_encodes_body() {
        let transport = RecordingTransport::replying(200, SUCCESSFUL_RESPONSE);
        let api = api(transport.clone(), TransportOptions::default());

        api.request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post([("state", "09231")])
            .unwrap();

        let request = transport.only_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, REQUEST_URL);
        assert_eq!(request.body.as_deref(), Some("state=09231"));
        assert_eq!(bearer(&request), Some(format!("Bearer {ACCESS_TOKEN}").as_str()));
    }

    #[test]
    fn put_and_delete_decode_empty_body_as_null() {
        for verb in [Method::PUT, Method::DELETE] {
            let transport = RecordingTransport::replying(200, "");
            let api = api(transport.clone(), TransportOptions::default());
            let mut request = api.request("/foo/bar", Some(ACCESS_TOKEN)).unwrap();

            let result = if verb == Method::PUT {
                request.put()
            } else {
                request.delete()
            };

            assert_eq!(result.unwrap(), Value::Null);
            let sent = transport.only_request();
            assert_eq!(sent.method, verb);
            assert_eq!(sent.url, REQUEST_URL);
            assert!(sent.body.is_none());
        }
    }

    #[test]
    fn client_identifier_goes_in_query() {
        let transport = RecordingTransport::replying(200, "");
        let api = api(transport.clone(), TransportOptions::default());

        api.request("/foo/bar", None)
            .unwrap()
            .with_client_identifier()
            .post(no_params())
            .unwrap();

        let request = transport.only_request();
        assert_eq!(request.url, format!("{REQUEST_URL}?client_id={CLIENT_ID}"));
        assert!(bearer(&request).is_none());
        assert!(request.basic_auth.is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn client_credentials_use_basic_auth() {
        let transport = RecordingTransport::replying(200, "1");
        let api = api(transport.clone(), TransportOptions::default());

        let result = api
            .request("/foo/bar", None)
            .unwrap()
            .with_client_credentials()
            .get(no_params())
            .unwrap();

        assert_eq!(result, json!(1));
        let request = transport.only_request();
        let auth = request.basic_auth.as_ref().expect("basic auth");
        assert_eq!(auth.username, CLIENT_ID);
        assert_eq!(auth.password.expose_str(), CLIENT_SECRET);
        assert_eq!(request.url, REQUEST_URL);
        assert!(bearer(&request).is_none());
    }

    #[test]
    fn explicit_access_token_matches_default() {
        let explicit = RecordingTransport::replying(200, "");
        let default = RecordingTransport::replying(200, "");

        api(explicit.clone(), TransportOptions::default())
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .with_access_token()
            .post(no_params())
            .unwrap();
        api(default.clone(), TransportOptions::default())
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post(no_params())
            .unwrap();

        let explicit = explicit.only_request();
        let default = default.only_request();
        assert_eq!(explicit.url, default.url);
        assert_eq!(explicit.headers, default.headers);
        assert_eq!(bearer(&default), Some(format!("Bearer {ACCESS_TOKEN}").as_str()));
    }

    #[test]
    fn missing_access_token_fails_before_network() {
        for verb in ["get", "post", "put", "delete"] {
            let transport = Arc::new(RecordingTransport::default());
            let api = api(transport.clone(), TransportOptions::default());
            let mut request = api.request("/foo/bar", None).unwrap();

            let result = match verb {
                "get" => request.get(no_params()),
                "post" => request.post(no_params()),
                "put" => request.put(),
                _ => request.delete(),
            };

            assert!(
                matches!(result, Err(Error::AccessTokenNotFound)),
                "{verb}: got {result:?}"
            );
            assert!(transport.requests().is_empty(), "{verb} must not reach the transport");
        }
    }

    #[test]
    fn get_with_credentials_and_token_puts_token_in_query() {
        let transport = RecordingTransport::replying(200, "");
        let api = api(transport.clone(), TransportOptions::default());

        api.request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .with_client_credentials()
            .with_client_identifier()
            .with_access_token()
            .get(no_params())
            .unwrap();

        let request = transport.only_request();
        assert_eq!(
            request.url,
            format!("{REQUEST_URL}?client_id={CLIENT_ID}&access_token={ACCESS_TOKEN}")
        );
        assert_eq!(request.basic_auth.as_ref().unwrap().username, CLIENT_ID);
        assert!(bearer(&request).is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn post_with_credentials_and_token_puts_token_in_body() {
        let transport = RecordingTransport::replying(200, "");
        let api = api(transport.clone(), TransportOptions::default());

        api.request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .with_client_credentials()
            .with_client_identifier()
            .with_access_token()
            .post(no_params())
            .unwrap();

        let request = transport.only_request();
        assert_eq!(request.url, format!("{REQUEST_URL}?client_id={CLIENT_ID}"));
        assert_eq!(
            request.body.as_deref(),
            Some(format!("access_token={ACCESS_TOKEN}").as_str())
        );
        assert!(bearer(&request).is_none());
    }

    #[test]
    fn selecting_a_method_twice_changes_nothing() {
        let once = RecordingTransport::replying(200, "");
        let thrice = RecordingTransport::replying(200, "");

        let once_api = api(once.clone(), TransportOptions::default());
        let mut request = once_api.request("/foo/bar", None).unwrap();
        request.with_client_credentials();
        assert_eq!(request.auth_methods(), vec![AuthMethod::ClientCredentials]);
        request.get(no_params()).unwrap();

        let thrice_api = api(thrice.clone(), TransportOptions::default());
        let mut request = thrice_api.request("/foo/bar", None).unwrap();
        request
            .with_client_credentials()
            .with_client_credentials()
            .with_client_credentials();
        assert_eq!(request.auth_methods(), vec![AuthMethod::ClientCredentials]);
        request.get(no_params()).unwrap();

        let (once, thrice) = (once.only_request(), thrice.only_request());
        assert_eq!(once.url, thrice.url);
        assert_eq!(once.headers, thrice.headers);
        assert_eq!(once.basic_auth, thrice.basic_auth);
    }

    #[test]
    fn custom_headers_are_sent_but_cannot_replace_user_agent() {
        let transport = RecordingTransport::replying(200, "");
        let options = TransportOptions {
            headers: vec![
                HeaderInjection {
                    name: "x-canvas".into(),
                    value: "1".into(),
                },
                HeaderInjection {
                    name: "user-agent".into(),
                    value: "custom-agent".into(),
                },
            ],
            ..Default::default()
        };
        let api = api(transport.clone(), options);

        api.request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post(no_params())
            .unwrap();

        let request = transport.only_request();
        assert_eq!(request.headers["x-canvas"], "1");
        assert_eq!(request.headers[header::USER_AGENT], crate::USER_AGENT);
    }

    #[test]
    fn second_send_is_rejected() {
        let transport = RecordingTransport::replying(200, "");
        let api = api(transport.clone(), TransportOptions::default());
        let mut request = api.request("/foo/bar", Some(ACCESS_TOKEN)).unwrap();

        request.post(no_params()).unwrap();
        assert!(request.is_sent());
        assert!(matches!(
            request.post(no_params()),
            Err(Error::RequestAlreadySent)
        ));
        assert!(matches!(request.get(no_params()), Err(Error::RequestAlreadySent)));
        assert!(matches!(request.put(), Err(Error::RequestAlreadySent)));
        assert!(matches!(request.delete(), Err(Error::RequestAlreadySent)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn failed_send_still_consumes_the_request() {
        let transport = Arc::new(RecordingTransport::default());
        transport.push(Err(TransportError::new("connect", "connection refused")));
        let api = api(transport.clone(), TransportOptions::default());
        let mut request = api.request("/foo/bar", Some(ACCESS_TOKEN)).unwrap();

        assert!(matches!(request.get(no_params()), Err(Error::Transport(_))));
        assert!(matches!(request.get(no_params()), Err(Error::RequestAlreadySent)));

        let mut tokenless = api.request("/foo/bar", None).unwrap();
        assert!(matches!(tokenless.put(), Err(Error::AccessTokenNotFound)));
        assert!(matches!(tokenless.put(), Err(Error::RequestAlreadySent)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn transport_error_keeps_native_code_and_message() {
        let transport = Arc::new(RecordingTransport::default());
        transport.push(Err(TransportError::new("timeout", "operation timed out")));
        let api = api(transport, TransportOptions::default());

        let err = api
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post(no_params())
            .unwrap_err();

        match err {
            Error::Transport(e) => {
                assert_eq!(e.code, "timeout");
                assert_eq!(e.message, "operation timed out");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn error_responses_are_classified() {
        let transport = RecordingTransport::replying(
            403,
            r#"{"error":"insufficient_scope","error_description":"Insufficient access scopes"}"#,
        );
        let api = api(transport, TransportOptions::default());

        let err = api
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post(no_params())
            .unwrap_err();

        match err.api_error() {
            Some(ApiError::InsufficientScope(details)) => {
                assert_eq!(details.status, 403);
                assert_eq!(details.error_type, "insufficient_scope");
                assert_eq!(details.description.as_deref(), Some("Insufficient access scopes"));
            }
            other => panic!("expected insufficient scope, got {other:?}"),
        }
    }

    #[test]
    fn authentication_challenge_without_body_is_classified() {
        let transport = Arc::new(RecordingTransport::default());
        let mut headers = HeaderMap::new();
        headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"foo\""));
        transport.push(Ok(HttpResponse {
            status: 401,
            headers,
            body: String::new(),
        }));
        let api = api(transport, TransportOptions::default());

        let err = api
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .post(no_params())
            .unwrap_err();
        assert!(matches!(err.api_error(), Some(ApiError::AccessTokenRequired(_))));
    }

    #[test]
    fn non_json_success_body_is_invalid_response() {
        let transport = RecordingTransport::replying(200, "<html>ok</html>");
        let api = api(transport, TransportOptions::default());

        let err = api
            .request("/foo/bar", Some(ACCESS_TOKEN))
            .unwrap()
            .get(no_params())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
    }

    #[test]
    fn params_are_url_encoded() {
        let transport = RecordingTransport::replying(200, "[]");
        let api = api(transport.clone(), TransportOptions::default());

        api.request("/users/current/friends", Some(ACCESS_TOKEN))
            .unwrap()
            .get([("q", "hello world"), ("filter", "a&b=c")])
            .unwrap();

        assert_eq!(
            transport.only_request().url,
            "https://tuenti.test/users/current/friends?q=hello+world&filter=a%26b%3Dc"
        );
    }

    #[test]
    fn params_set_replaces_in_place() {
        let mut params: Params = [("a", "1"), ("b", "2")].into_iter().collect();
        params.set("a", "3");
        assert_eq!(params.get("a"), Some("3"));
        assert_eq!(params.len(), 2);
        assert_eq!(params.encode(), "a=3&b=2");
        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![("a", "3"), ("b", "2")]
        );
    }
}
