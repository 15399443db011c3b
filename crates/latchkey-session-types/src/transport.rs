//! Extraction of the transport token from an inbound request.

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use http::request::Parts;
use http::{StatusCode, header::AUTHORIZATION};

use crate::cookie::SESSION_COOKIE;

/// Raw transport token presented by the client.
///
/// Taken from `Authorization: Bearer <token>` when present, otherwise from
/// the session cookie. Extraction does not validate the token; pass it to the
/// gateway's session resolution for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pull a token out of request headers, if any.
    pub fn from_headers(headers: &http::HeaderMap) -> Option<Self> {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(token) = bearer {
            return Some(Self(token.to_owned()));
        }

        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty())
            .map(Self)
    }
}

/// Rejection when no token is present. Renders like every other
/// unauthenticated response from the gateway.
#[derive(Debug)]
pub struct MissingSessionToken;

impl IntoResponse for MissingSessionToken {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "kind": "UNAUTHENTICATED",
            "message": "unauthenticated",
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = MissingSessionToken;

    // Extract synchronously and return a 'static future; an `async fn` here
    // would capture the `parts` lifetime.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = Self::from_headers(&parts.headers);
        async move { token.ok_or(MissingSessionToken) }
    }
}
