//! Tuenti application SDK
//!
//! Ties together signed-context verification, authenticated REST requests
//! and the OAuth 2.0 authorization-code flow. Ambient request data and
//! token persistence are injected through [`RequestContext`] and
//! [`PersistentStore`], so nothing here reads process globals.
//!
//! Authorization flow:
//! 1. `authorize::generate_state()` + `Tuenti::authorization_url()` send the
//!    user to the platform dialog (the caller stores `state`)
//! 2. The platform redirects back with `code` (or `error`)
//! 3. `Tuenti::complete_authorization()` exchanges the code with client
//!    credentials and persists the access token
//! 4. `Tuenti::api()` requests authenticate with that token by default

pub mod authorize;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod sdk;
pub mod storage;
pub mod token;

#[cfg(test)]
mod test_support;

pub use authorize::{build_authorization_url, generate_state};
pub use config::Config;
pub use constants::*;
pub use environment::{RequestContext, RequestData, canonical_url};
pub use error::{Error, Result};
pub use sdk::Tuenti;
pub use storage::{FileStore, MemoryStore, PersistentStore, scoped_key};
pub use token::{AccessTokenManager, TokenResponse};

pub use tuenti_api::{ApiError, ApiRequest, ErrorDetails, Transport, TransportOptions};
pub use tuenti_context::{Claims, ContextError, SignedContext};
