//! Signed context verification
//!
//! The platform posts a compact `header.payload.signature` token along with
//! the first request of an embedded application. Each segment is URL-safe
//! base64; the signature is HMAC-SHA256 over `header.payload` keyed with the
//! application's client secret.
//!
//! Verification is strict and ordered: segment count, then header
//! (`typ = JWT`, `alg = HS256`, no negotiation), then payload (issuer,
//! audience, expiry), then signature. The first failing check decides the
//! error message.

pub mod error;
pub mod mint;
pub mod verify;

pub use error::{ContextError, Result};
pub use mint::sign;
pub use verify::{Claims, SignedContext, verify};

/// Issuer every platform-signed context carries in `iss`
pub const ISSUER: &str = "http://tuenti.com";

/// Only supported token type
pub const TOKEN_TYPE: &str = "JWT";

/// Only supported signing algorithm
pub const ALGORITHM: &str = "HS256";

/// Structural claims stripped before handing custom fields to the caller
pub const RESERVED_CLAIMS: [&str; 4] = ["exp", "iat", "aud", "iss"];
