use std::sync::Arc;

use auth::Authenticator;

use crate::domain::identity::models::Login;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::IdentityError;

/// Resolves login + password to a subject id.
///
/// Read-only: safe to run concurrently for the same login.
pub struct Authentication<R>
where
    R: IdentityRepository + ?Sized,
{
    repository: Arc<R>,
    authenticator: Arc<Authenticator>,
}

impl<R> Authentication<R>
where
    R: IdentityRepository + ?Sized,
{
    pub fn new(repository: Arc<R>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Verify credentials.
    ///
    /// Unknown login and wrong password produce the same error after the
    /// same amount of Argon2 work. Hashing runs on the blocking pool.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown login or password mismatch
    /// * `StorageUnavailable` - Lookup failed
    /// * `Internal` - Stored hash could not be verified
    pub async fn authenticate(
        &self,
        login: &Login,
        password: &Password,
    ) -> Result<SubjectId, IdentityError> {
        let password = password.expose().to_string();
        let authenticator = Arc::clone(&self.authenticator);

        let Some(user) = self.repository.find_user_by_login(login).await? else {
            tokio::task::spawn_blocking(move || {
                authenticator.verify_password_without_account(&password)
            })
            .await??;

            tracing::debug!(login = %login, "Authentication failed: unknown login");
            return Err(IdentityError::InvalidCredentials);
        };

        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || {
            authenticator.verify_password(&password, &stored_hash)
        })
        .await?
        .map_err(|e| {
            tracing::error!(subject_id = %user.subject_id, error = %e, "Stored password hash is unusable");
            IdentityError::from(e)
        })?;

        if !matches {
            tracing::debug!(subject_id = %user.subject_id, "Authentication failed: password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(user.subject_id)
    }
}
