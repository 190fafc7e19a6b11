//! Signed context issuance
//!
//! Produces the same compact format the platform posts to embedded
//! applications. Used to simulate the platform in tests and local setups.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::Mac;
use serde_json::{Value, json};

use crate::error::{ContextError, Result};
use crate::verify::{Claims, HmacSha256};
use crate::{ALGORITHM, TOKEN_TYPE};

/// Sign `claims` with `client_secret` as `base64url(header).base64url(claims).base64url(mac)`.
///
/// The claims are written as given; callers supply `iss`, `aud` and `exp`.
pub fn sign(claims: &Claims, client_secret: &[u8]) -> Result<String> {
    let header = json!({ "alg": ALGORITHM, "typ": TOKEN_TYPE });
    let header = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload = URL_SAFE_NO_PAD.encode(Value::Object(claims.clone()).to_string());

    let mut mac = HmacSha256::new_from_slice(client_secret)
        .map_err(|e| ContextError::invalid(format!("unusable signing key: {e}")))?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{header}.{payload}.{signature}"))
}
