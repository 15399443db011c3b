use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};

/// Transient failure of a backing store (connection, timeout, query error).
///
/// Always retryable from the caller's point of view; never a verdict on the
/// credential being checked.
#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct StoreError(#[source] pub anyhow::Error);

impl StoreError {
    pub fn msg(message: &'static str) -> Self {
        Self(anyhow::anyhow!(message))
    }
}

/// Attach a description to a store driver error, classifying it as [`StoreError`].
pub trait StoreResultExt<T> {
    fn store_context(self, context: &'static str) -> Result<T, StoreError>;
}

impl<T, E> StoreResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn store_context(self, context: &'static str) -> Result<T, StoreError> {
        self.map_err(|e| StoreError(anyhow::Error::new(e).context(context)))
    }
}

/// Why a code store refused to consume a login attempt.
///
/// Internal only: the verifier collapses everything except `Store` into
/// [`GatewayError::InvalidOrExpired`].
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("login attempt not found")]
    NotFound,
    #[error("login attempt expired")]
    Expired,
    #[error("login attempt already consumed")]
    AlreadyConsumed,
    #[error("code mismatch")]
    CodeMismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced at the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("could not issue code")]
    InvalidEmail,
    #[error("could not issue code")]
    TooManyAttempts,
    #[error("invalid or expired link")]
    InvalidOrExpired,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("store unavailable, retry later")]
    StoreUnavailable(#[from] StoreError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<ConsumeError> for GatewayError {
    fn from(err: ConsumeError) -> Self {
        match err {
            ConsumeError::Store(e) => Self::StoreUnavailable(e),
            ConsumeError::NotFound
            | ConsumeError::Expired
            | ConsumeError::AlreadyConsumed
            | ConsumeError::CodeMismatch => Self::InvalidOrExpired,
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            Self::InvalidOrExpired => "INVALID_OR_EXPIRED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidEmail => StatusCode::BAD_REQUEST,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidOrExpired | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are expected client outcomes and TraceLayer already records them.
        // 5xx need the cause chain, which never reaches the client.
        match &self {
            Self::StoreUnavailable(e) => {
                tracing::error!(error = ?e, kind = self.kind(), "store unavailable");
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, kind = self.kind(), "internal error");
            }
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, Self::StoreUnavailable(_)) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
