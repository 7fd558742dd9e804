//! HS256 bearer tokens: `header.claims.signature`, each segment base64url
//! without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use super::CryptoError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

fn mac(secret: &[u8]) -> Result<HmacSha256, CryptoError> {
    HmacSha256::new_from_slice(secret).map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Issue a token for `user_id` valid for `lifetime_secs` from `now`.
pub fn sign_token(
    secret: &[u8],
    user_id: Uuid,
    email: &str,
    now: i64,
    lifetime_secs: i64,
) -> Result<String, CryptoError> {
    let header = TokenHeader {
        alg: "HS256".into(),
        typ: "JWT".into(),
    };
    let claims = TokenClaims {
        sub: user_id,
        email: email.to_string(),
        iat: now,
        exp: now + lifetime_secs,
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| CryptoError::Signing(e.to_string()))?;
    let claims_json =
        serde_json::to_vec(&claims).map_err(|e| CryptoError::Signing(e.to_string()))?;

    let message = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let mut mac = mac(secret)?;
    mac.update(message.as_bytes());
    let signature = mac.finalize().into_bytes();
    Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Check signature and expiry, returning the claims.
pub fn verify_token(secret: &[u8], token: &str, now: i64) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(claims), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;
    let mut mac = mac(secret).map_err(|_| TokenError::BadSignature)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(claims.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims)
        .map_err(|_| TokenError::Malformed)?;
    let claims: TokenClaims =
        serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;

    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}
