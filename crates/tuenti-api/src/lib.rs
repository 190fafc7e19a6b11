//! Authenticated access to the Tuenti REST API
//!
//! Every call goes through a single-use [`ApiRequest`]:
//! 1. `ApiClient::request()` validates the resource path
//! 2. `with_client_identifier()` / `with_client_credentials()` /
//!    `with_access_token()` select authentication (resource owner by default)
//! 3. `get()` / `post()` / `put()` / `delete()` sends exactly once through a
//!    [`Transport`]
//! 4. Non-success responses are mapped by [`classify`] onto [`ApiError`]
//!
//! The crate performs no retries, refreshes or caching; each request object
//! models one HTTP exchange.

pub mod classify;
pub mod client;
pub mod error;
pub mod request;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classify::{ErrorBody, classify};
pub use client::{ApiClient, ClientIdentity, validate_path};
pub use error::{ApiError, Error, ErrorDetails, Result};
pub use request::{ApiRequest, AuthMethod, Params};
pub use transport::{
    BasicAuth, HeaderInjection, HttpRequest, HttpResponse, ReqwestTransport, Transport,
    TransportError, TransportOptions,
};

/// Product identifier sent as `User-Agent`; custom options cannot replace it.
pub const USER_AGENT: &str = concat!("tuenti-rust-sdk-", env!("CARGO_PKG_VERSION"));
