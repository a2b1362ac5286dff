use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;

/// Claims carried in the credential payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_level", skip_serializing_if = "Option::is_none")]
    pub clearance_level: Option<i32>,
    /// Seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

// A level claim of the wrong type reads as "no level" rather than poisoning
// the whole credential.
fn lenient_level<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    let n = match v {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(n.and_then(|n| i32::try_from(n).ok()))
}

impl Claims {
    /// `exp` converted to milliseconds once and compared with wall-clock ms.
    /// A credential without `exp` does not expire client-side.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.exp {
            Some(exp) => exp.saturating_mul(1000) < now_ms,
            None => false,
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.email.as_deref().or(self.sub.as_deref())
    }

    /// Serialize into a `header.payload.` token with an empty signature. Used
    /// by in-process authorities; the real authority signs its own.
    pub fn encode_unsigned(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = serde_json::to_vec(self).unwrap_or_default();
        format!("{}.{}.", header, URL_SAFE_NO_PAD.encode(payload))
    }
}

/// Decode the payload segment. The signature is not checked here; the
/// authority verifies it on every request. Expiry is left to `decode_valid`.
pub fn decode_claims(raw: &str) -> Result<Claims, DecodeError> {
    let raw = raw.trim();
    if raw.split('.').count() != 3 {
        return Err(DecodeError::Shape);
    }
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation.insecure_disable_signature_validation();

    decode::<Claims>(raw, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidToken => DecodeError::Shape,
            ErrorKind::Base64(_) => DecodeError::Base64(e.to_string()),
            _ => DecodeError::Claims(e.to_string()),
        })
}

/// Decode and reject expired credentials.
pub fn decode_valid(raw: &str, now_ms: i64) -> Result<Claims, DecodeError> {
    let claims = decode_claims(raw)?;
    if claims.is_expired_at(now_ms) {
        return Err(DecodeError::Expired { exp_secs: claims.exp.unwrap_or_default() });
    }
    Ok(claims)
}
