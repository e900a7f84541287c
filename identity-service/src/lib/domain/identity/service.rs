use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Duration;

use crate::domain::identity::authentication::Authentication;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::LoginCommand;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::RefreshToken;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::models::TokenPair;
use crate::domain::identity::ports::IdentityRepository;
use crate::domain::identity::ports::IdentityServicePort;
use crate::domain::identity::refresh::RefreshTokenLifecycle;
use crate::identity::errors::IdentityError;

/// Domain service implementation for identity operations.
///
/// Generic over the repository so the same code drives the PostgreSQL store,
/// the file store, or `dyn IdentityRepository` chosen at startup.
pub struct IdentityService<R>
where
    R: IdentityRepository + ?Sized,
{
    repository: Arc<R>,
    authenticator: Arc<Authenticator>,
    authentication: Authentication<R>,
    refresh_tokens: RefreshTokenLifecycle<R>,
}

impl<R> IdentityService<R>
where
    R: IdentityRepository + ?Sized,
{
    /// Create a new identity service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Storage realization
    /// * `authenticator` - Password hasher and access token signer
    /// * `refresh_token_ttl` - Lifetime of issued refresh tokens
    pub fn new(
        repository: Arc<R>,
        authenticator: Arc<Authenticator>,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            authentication: Authentication::new(Arc::clone(&repository), Arc::clone(&authenticator)),
            refresh_tokens: RefreshTokenLifecycle::new(Arc::clone(&repository), refresh_token_ttl),
            repository,
            authenticator,
        }
    }

    fn token_pair(&self, refresh_token: RefreshToken) -> Result<TokenPair, IdentityError> {
        let access = self
            .authenticator
            .issue_access_token(&refresh_token.subject_id.to_string())?;

        Ok(TokenPair {
            subject_id: refresh_token.subject_id,
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh_token.token,
            refresh_token_expires_at: refresh_token.expires_at,
        })
    }
}

#[async_trait]
impl<R> IdentityServicePort for IdentityService<R>
where
    R: IdentityRepository + ?Sized,
{
    async fn register(&self, command: RegisterCommand) -> Result<SubjectId, IdentityError> {
        let authenticator = Arc::clone(&self.authenticator);
        let password = command.password.expose().to_string();
        let password_hash =
            tokio::task::spawn_blocking(move || authenticator.hash_password(&password)).await??;

        let user = NewUser {
            login: command.login,
            password_hash,
            subject_id: SubjectId::new(),
        };

        let created = self.repository.create_user(user).await?;

        tracing::info!(subject_id = %created.subject_id, user_id = created.id, "User registered");
        Ok(created.subject_id)
    }

    async fn login(&self, command: LoginCommand) -> Result<TokenPair, IdentityError> {
        let subject_id = self
            .authentication
            .authenticate(&command.login, &command.password)
            .await?;

        let refresh_token = self.refresh_tokens.issue(subject_id).await?;
        let pair = self.token_pair(refresh_token)?;

        tracing::info!(subject_id = %subject_id, "Login succeeded");
        Ok(pair)
    }

    fn verify_access_token(&self, token: &str) -> Result<SubjectId, IdentityError> {
        let subject = self.authenticator.verify_access_token(token).map_err(|e| {
            tracing::warn!(error = %e, "Access token rejected");
            IdentityError::InvalidToken
        })?;

        SubjectId::from_string(&subject).map_err(|e| {
            tracing::warn!(error = %e, "Access token carries malformed subject");
            IdentityError::InvalidToken
        })
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, IdentityError> {
        let replacement = self.refresh_tokens.rotate(refresh_token).await?;
        self.token_pair(replacement)
    }

    async fn logout(&self, refresh_token: &str) {
        if let Err(e) = self.refresh_tokens.revoke(refresh_token).await {
            tracing::error!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    async fn get_profile(&self, subject_id: &SubjectId) -> Result<Profile, IdentityError> {
        self.repository
            .find_profile(subject_id)
            .await?
            .ok_or(IdentityError::NotFound(format!("profile {}", subject_id)))
    }

    async fn set_profile(
        &self,
        subject_id: &SubjectId,
        email: EmailAddress,
    ) -> Result<Profile, IdentityError> {
        let profile = Profile {
            subject_id: *subject_id,
            email,
        };

        self.repository.upsert_profile(&profile).await?;

        tracing::debug!(subject_id = %subject_id, "Profile updated");
        Ok(profile)
    }

    async fn sweep_expired_refresh_tokens(&self) -> u64 {
        match self.refresh_tokens.sweep_expired().await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!(removed, "Expired refresh tokens removed");
                }
                removed
            }
            Err(e) => {
                tracing::warn!(error = %e, "Expired refresh token sweep failed");
                0
            }
        }
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        Ok(self.repository.ping().await?)
    }
}
