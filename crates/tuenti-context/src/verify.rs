//! Signed context parsing and verification

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use tracing::debug;

use crate::error::{ContextError, Result};
use crate::{ALGORITHM, ISSUER, RESERVED_CLAIMS, TOKEN_TYPE};

/// Claim map decoded from the payload segment.
pub type Claims = Map<String, Value>;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// URL-safe alphabet, padding optional on decode.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const INVALID_HEADER: &str = "Invalid header";
const INVALID_PAYLOAD: &str = "Invalid payload";
const INVALID_SIGNATURE: &str = "Invalid signature";

/// Verify a raw signed context and return its custom (non-reserved) claims.
///
/// `now` is the request time in Unix seconds; the context is accepted only
/// while `exp > now`.
pub fn verify(
    raw: Option<&str>,
    client_id: &str,
    client_secret: &[u8],
    now: u64,
) -> Result<Claims> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ContextError::NotFound),
    };

    let segments: Vec<&str> = raw.split('.').collect();
    let &[header, payload, signature] = segments.as_slice() else {
        return Err(ContextError::invalid(format!(
            "Expected 3 dot-separated components, found {}",
            segments.len()
        )));
    };

    if !header_is_valid(header) {
        return Err(ContextError::invalid(INVALID_HEADER));
    }

    let mut claims = decode_payload(payload, client_id, now)
        .ok_or_else(|| ContextError::invalid(INVALID_PAYLOAD))?;

    if !signature_is_valid(header, payload, signature, client_secret) {
        return Err(ContextError::invalid(INVALID_SIGNATURE));
    }

    for key in RESERVED_CLAIMS {
        claims.remove(key);
    }
    debug!(custom_fields = claims.len(), "signed context verified");
    Ok(claims)
}

fn header_is_valid(segment: &str) -> bool {
    let Ok(bytes) = URL_SAFE_LENIENT.decode(segment) else {
        return false;
    };
    // Only a JSON object counts; arrays and scalars are not headers
    let Ok(header) = serde_json::from_slice::<Map<String, Value>>(&bytes) else {
        return false;
    };
    header.get("typ").and_then(Value::as_str) == Some(TOKEN_TYPE)
        && header.get("alg").and_then(Value::as_str) == Some(ALGORITHM)
}

fn decode_payload(segment: &str, client_id: &str, now: u64) -> Option<Claims> {
    let bytes = URL_SAFE_LENIENT.decode(segment).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    let issuer_matches = claims.get("iss").and_then(Value::as_str) == Some(ISSUER);
    let audience_matches = claims.get("aud").and_then(Value::as_str) == Some(client_id);
    let unexpired = claims
        .get("exp")
        .and_then(Value::as_f64)
        .is_some_and(|exp| exp > now as f64);

    (issuer_matches && audience_matches && unexpired).then_some(claims)
}

fn signature_is_valid(header: &str, payload: &str, signature: &str, secret: &[u8]) -> bool {
    let Ok(signature) = URL_SAFE_LENIENT.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&signature).is_ok()
}

/// A signed context verified once, with the outcome kept for later lookups.
///
/// Once a context is found invalid it stays invalid; every accessor reports
/// the same error.
#[derive(Debug, Clone)]
pub struct SignedContext {
    outcome: Result<Claims>,
}

impl SignedContext {
    pub fn parse(raw: Option<&str>, client_id: &str, client_secret: &[u8], now: u64) -> Self {
        Self {
            outcome: verify(raw, client_id, client_secret, now),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Custom fields of the context (reserved claims removed).
    pub fn custom_fields(&self) -> Result<&Claims> {
        self.outcome.as_ref().map_err(Clone::clone)
    }

    /// A single custom field; `Ok(None)` when the context is valid but lacks it.
    pub fn field(&self, name: &str) -> Result<Option<&Value>> {
        self.custom_fields().map(|fields| fields.get(name))
    }

    pub fn into_result(self) -> Result<Claims> {
        self.outcome
    }
}
