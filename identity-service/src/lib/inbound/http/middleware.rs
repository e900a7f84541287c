use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

/// Extension type carrying the subject proven by the access token
#[derive(Debug, Clone)]
pub struct AuthenticatedSubject {
    pub subject_id: SubjectId,
}

/// Middleware that verifies the Bearer access token and adds the subject to
/// request extensions. Storage is never consulted.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(&req)?;

    let subject_id = state
        .identity_service
        .verify_access_token(token)
        .map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

    req.extensions_mut()
        .insert(AuthenticatedSubject { subject_id });

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, ApiError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ApiError::Unauthorized(
                "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            )
        })?;

    Ok(token)
}
