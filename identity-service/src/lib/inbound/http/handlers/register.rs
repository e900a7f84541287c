use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::identity::models::Login;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;
use crate::identity::errors::LoginError;
use crate::identity::errors::PasswordPolicyError;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<ApiSuccess<RegisterResponseData>, ApiError> {
    state
        .identity_service
        .register(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|subject_id| ApiSuccess::new(StatusCode::CREATED, subject_id.into()))
}

/// HTTP request body for registering a user (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    login: String,
    password: String,
}

#[derive(Debug, Clone, Error)]
enum ParseRegisterRequestError {
    #[error("Invalid login: {0}")]
    Login(#[from] LoginError),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordPolicyError),
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, ParseRegisterRequestError> {
        let login = Login::new(self.login)?;
        let password = Password::new(self.password)?;
        Ok(RegisterCommand::new(login, password))
    }
}

impl From<ParseRegisterRequestError> for ApiError {
    fn from(err: ParseRegisterRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponseData {
    pub user_id: String,
}

impl From<SubjectId> for RegisterResponseData {
    fn from(subject_id: SubjectId) -> Self {
        Self {
            user_id: subject_id.to_string(),
        }
    }
}
