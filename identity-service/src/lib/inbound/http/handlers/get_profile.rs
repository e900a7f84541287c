use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::middleware::AuthenticatedSubject;
use crate::inbound::http::router::AppState;
use crate::identity::errors::IdentityError;

/// Profile of the caller. A subject without a profile gets `email: null`.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedSubject>,
) -> Result<ApiSuccess<ProfileResponseData>, ApiError> {
    let email = match state.identity_service.get_profile(&caller.subject_id).await {
        Ok(profile) => Some(profile.email.as_str().to_string()),
        Err(IdentityError::NotFound(_)) => None,
        Err(e) => return Err(ApiError::from(e)),
    };

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ProfileResponseData::new(caller.subject_id, email),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileResponseData {
    pub user_id: String,
    pub email: Option<String>,
}

impl ProfileResponseData {
    pub fn new(subject_id: SubjectId, email: Option<String>) -> Self {
        Self {
            user_id: subject_id.to_string(),
            email,
        }
    }
}
