//! Session transport tokens.
//!
//! A transport token is an HS256 JWT naming the user (`sub`) and the session
//! row (`sid`). The signature makes it unguessable; the session row is what
//! makes it revocable, so a valid signature alone never authenticates.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "TOKEN_ISSUER", test))]
use serde::Serialize;

use latchkey_domain::id::{SessionId, UserId};

/// Identity carried by a signature-valid, unexpired token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokenInfo {
    pub user_id: UserId,
    pub session_id: SessionId,
    /// Expiration timestamp (seconds since UNIX epoch).
    pub exp: u64,
}

/// Errors returned by [`decode_session_token`].
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// JWT claims payload.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | user id (UUID string) |
/// | `sid` | custom | session id (UUID string) |
/// | `exp` | `exp` | seconds since epoch |
///
/// [`Serialize`] requires the **`TOKEN_ISSUER`** feature; only the gateway
/// mints tokens.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "TOKEN_ISSUER", test), derive(Serialize))]
pub struct SessionClaims {
    pub sub: String,
    pub sid: String,
    pub exp: u64,
}

/// Validate signature and expiry (HS256, no leeway) and parse the ids.
pub fn decode_session_token(token: &str, secret: &str) -> Result<SessionTokenInfo, TokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    let claims = data.claims;
    Ok(SessionTokenInfo {
        user_id: claims.sub.parse().map_err(|_| TokenError::Malformed)?,
        session_id: claims.sid.parse().map_err(|_| TokenError::Malformed)?,
        exp: claims.exp,
    })
}

/// Mint a transport token for a session.
#[cfg(any(feature = "TOKEN_ISSUER", test))]
pub fn encode_session_token(
    info: &SessionTokenInfo,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: info.user_id.to_string(),
        sid: info.session_id.to_string(),
        exp: info.exp,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
}
