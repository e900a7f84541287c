use axum::extract::State;
use axum::http::StatusCode;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::identity::models::Login;
use crate::domain::identity::models::LoginCommand;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::TokenPair;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    // Malformed input is reported like a failed login.
    let login = Login::new(body.login)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    let password = Password::new(body.password)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    state
        .identity_service
        .login(LoginCommand::new(login, password))
        .await
        .map_err(ApiError::from)
        .map(|ref pair| ApiSuccess::new(StatusCode::OK, pair.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    login: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&TokenPair> for LoginResponseData {
    fn from(pair: &TokenPair) -> Self {
        Self {
            user_id: pair.subject_id.to_string(),
            token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            expires_at: pair.access_token_expires_at,
        }
    }
}
