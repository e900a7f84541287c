use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Deserialize;

use super::get_profile::ProfileResponseData;
use super::ApiError;
use super::ApiJson;
use super::ApiSuccess;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::middleware::AuthenticatedSubject;
use crate::inbound::http::router::AppState;

pub async fn set_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedSubject>,
    ApiJson(body): ApiJson<SetProfileRequest>,
) -> Result<ApiSuccess<ProfileResponseData>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|e| ApiError::UnprocessableEntity(format!("Invalid email: {}", e)))?;

    state
        .identity_service
        .set_profile(&caller.subject_id, email)
        .await
        .map_err(ApiError::from)
        .map(|profile| {
            ApiSuccess::new(
                StatusCode::OK,
                ProfileResponseData::new(
                    profile.subject_id,
                    Some(profile.email.as_str().to_string()),
                ),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetProfileRequest {
    email: String,
}
