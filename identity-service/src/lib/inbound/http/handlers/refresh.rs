use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::identity::models::TokenPair;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<ApiSuccess<RefreshResponseData>, ApiError> {
    state
        .identity_service
        .refresh_session(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|ref pair| ApiSuccess::new(StatusCode::OK, pair.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshResponseData {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&TokenPair> for RefreshResponseData {
    fn from(pair: &TokenPair) -> Self {
        Self {
            token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            expires_at: pair.access_token_expires_at,
        }
    }
}
