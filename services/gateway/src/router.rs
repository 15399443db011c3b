use std::time::Duration;

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower::timeout::{TimeoutLayer, error::Elapsed};

use latchkey_core::health::healthz;
use latchkey_core::middleware::with_request_tracing;

use crate::error::{GatewayError, StoreError};
use crate::handlers::{
    health::readyz,
    login::create_login,
    session::{delete_session, get_session},
    verify::verify_link,
};
use crate::state::AppState;

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Magic link
        .route("/auth/login", post(create_login))
        .route("/auth/verify", get(verify_link))
        // Session
        .route("/auth/session", get(get_session).delete(delete_session))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(request_timeout)),
        );
    with_request_tracing(router)
}

/// A hung store answers like any other store outage: 503 with `Retry-After`.
async fn handle_timeout(err: BoxError) -> GatewayError {
    if err.is::<Elapsed>() {
        GatewayError::StoreUnavailable(StoreError::msg("request timed out"))
    } else {
        GatewayError::Internal(anyhow::anyhow!("middleware error: {err}"))
    }
}
