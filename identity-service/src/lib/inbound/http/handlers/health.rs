use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

/// Liveness plus storage reachability.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.identity_service.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}
