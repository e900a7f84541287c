use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::ApiError;
use super::ApiJson;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

/// Revoke a refresh token. Responds 204 whether or not the token existed.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LogoutRequest>,
) -> Result<StatusCode, ApiError> {
    if body.refresh_token.trim().is_empty() {
        return Err(ApiError::BadRequest("refresh_token is required".to_string()));
    }

    state.identity_service.logout(&body.refresh_token).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogoutRequest {
    refresh_token: String,
}
