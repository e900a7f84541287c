use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::identity::models::RefreshToken;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::IdentityError;
use crate::identity::errors::StorageError;

const TOKEN_BYTES: usize = 32;

/// Refresh token state machine: issue, rotate on use, revoke, expire.
pub struct RefreshTokenLifecycle<R>
where
    R: IdentityRepository + ?Sized,
{
    repository: Arc<R>,
    ttl: Duration,
}

impl<R> RefreshTokenLifecycle<R>
where
    R: IdentityRepository + ?Sized,
{
    pub fn new(repository: Arc<R>, ttl: Duration) -> Self {
        Self { repository, ttl }
    }

    /// Issue a new active token for `subject_id`.
    ///
    /// # Errors
    /// * `Internal` - Entropy source failed or token collided
    /// * `StorageUnavailable` - Persisting failed
    pub async fn issue(&self, subject_id: SubjectId) -> Result<RefreshToken, IdentityError> {
        let token = self.mint(subject_id, Utc::now())?;

        self.repository
            .create_refresh_token(&token)
            .await
            .map_err(collision_is_internal)?;

        tracing::debug!(subject_id = %subject_id, expires_at = %token.expires_at, "Refresh token issued");
        Ok(token)
    }

    /// Consume `presented` and issue its replacement.
    ///
    /// The presented token is revoked even though the replacement belongs to
    /// the same subject, so a replayed copy fails from then on.
    ///
    /// # Errors
    /// * `InvalidToken` - Unknown, revoked, expired, or consumed concurrently
    /// * `Internal` - Entropy source failed or token collided
    /// * `StorageUnavailable` - Store failed
    pub async fn rotate(&self, presented: &str) -> Result<RefreshToken, IdentityError> {
        let now = Utc::now();

        let Some(stored) = self.repository.find_refresh_token(presented).await? else {
            tracing::warn!("Refresh rejected: unknown token");
            return Err(IdentityError::InvalidToken);
        };

        if stored.revoked {
            tracing::warn!(subject_id = %stored.subject_id, "Refresh rejected: token already revoked");
            return Err(IdentityError::InvalidToken);
        }
        if stored.is_expired(now) {
            tracing::info!(subject_id = %stored.subject_id, "Refresh rejected: token expired");
            return Err(IdentityError::InvalidToken);
        }

        let replacement = self.mint(stored.subject_id, now)?;

        let rotated = self
            .repository
            .rotate_refresh_token(presented, &replacement, now)
            .await
            .map_err(collision_is_internal)?;

        if !rotated {
            tracing::warn!(subject_id = %stored.subject_id, "Refresh rejected: token consumed concurrently");
            return Err(IdentityError::InvalidToken);
        }

        tracing::debug!(subject_id = %stored.subject_id, "Refresh token rotated");
        Ok(replacement)
    }

    /// Revoke `token` if it exists. Unknown tokens are not an error.
    ///
    /// # Errors
    /// * `StorageUnavailable` - Store failed
    pub async fn revoke(&self, token: &str) -> Result<(), IdentityError> {
        match self.repository.revoke_refresh_token(token).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => {
                tracing::debug!("Revoke requested for unknown refresh token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete tokens that expired at or before now.
    ///
    /// # Errors
    /// * `StorageUnavailable` - Sweep could not run
    pub async fn sweep_expired(&self) -> Result<u64, IdentityError> {
        Ok(self
            .repository
            .delete_expired_refresh_tokens(Utc::now())
            .await?)
    }

    fn mint(&self, subject_id: SubjectId, now: DateTime<Utc>) -> Result<RefreshToken, IdentityError> {
        Ok(RefreshToken {
            token: generate_token()?,
            subject_id,
            expires_at: now + self.ttl,
            revoked: false,
        })
    }
}

/// 256 random bits from the OS, base64url without padding.
fn generate_token() -> Result<String, IdentityError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| IdentityError::Internal(format!("Failed to generate refresh token: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

fn collision_is_internal(err: StorageError) -> IdentityError {
    match err {
        StorageError::AlreadyExists(_) => {
            IdentityError::Internal("Refresh token collision".to_string())
        }
        other => other.into(),
    }
}
