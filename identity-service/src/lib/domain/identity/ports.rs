use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Login;
use crate::domain::identity::models::LoginCommand;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::RefreshToken;
use crate::domain::identity::models::RegisterCommand;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::models::TokenPair;
use crate::domain::identity::models::User;
use crate::identity::errors::IdentityError;
use crate::identity::errors::StorageError;

/// Port for identity domain operations consumed by inbound adapters.
#[async_trait]
pub trait IdentityServicePort: Send + Sync + 'static {
    /// Register a new user.
    ///
    /// # Returns
    /// Subject id assigned to the user
    ///
    /// # Errors
    /// * `AlreadyExists` - Login is taken
    /// * `StorageUnavailable` - Backing store failed
    async fn register(&self, command: RegisterCommand) -> Result<SubjectId, IdentityError>;

    /// Check credentials and open a session.
    ///
    /// # Returns
    /// Access token and a fresh refresh token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown login or wrong password (indistinguishable)
    /// * `StorageUnavailable` - Backing store failed
    async fn login(&self, command: LoginCommand) -> Result<TokenPair, IdentityError>;

    /// Verify an access token without touching storage.
    ///
    /// # Errors
    /// * `InvalidToken` - Tampered, foreign, malformed or expired token
    fn verify_access_token(&self, token: &str) -> Result<SubjectId, IdentityError>;

    /// Exchange a refresh token for a new token pair, consuming it.
    ///
    /// # Errors
    /// * `InvalidToken` - Unknown, revoked, already used or expired token
    /// * `StorageUnavailable` - Backing store failed
    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, IdentityError>;

    /// Revoke a refresh token. Never fails from the caller's perspective.
    async fn logout(&self, refresh_token: &str);

    /// Read the profile of a subject.
    ///
    /// # Errors
    /// * `NotFound` - No profile has been set
    /// * `StorageUnavailable` - Backing store failed
    async fn get_profile(&self, subject_id: &SubjectId) -> Result<Profile, IdentityError>;

    /// Create or replace the profile of a subject.
    ///
    /// # Errors
    /// * `StorageUnavailable` - Backing store failed
    async fn set_profile(
        &self,
        subject_id: &SubjectId,
        email: EmailAddress,
    ) -> Result<Profile, IdentityError>;

    /// Delete expired refresh tokens. Failures are logged, never returned.
    ///
    /// # Returns
    /// Number of tokens removed
    async fn sweep_expired_refresh_tokens(&self) -> u64;

    /// Check the backing store is reachable.
    ///
    /// # Errors
    /// * `StorageUnavailable` - Backing store failed
    async fn health_check(&self) -> Result<(), IdentityError>;
}

/// Persistence operations for users, profiles and refresh tokens.
///
/// Implementations must be safe to call from many tasks at once and enforce
/// uniqueness atomically (no read-then-write windows).
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Persist a new user and assign its sequence id.
    ///
    /// # Errors
    /// * `AlreadyExists` - Login or subject id already present
    /// * `Unavailable` - Store failed
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// Retrieve user by login.
    ///
    /// # Returns
    /// Optional user (None if not found)
    ///
    /// # Errors
    /// * `Unavailable` - Store failed
    async fn find_user_by_login(&self, login: &Login) -> Result<Option<User>, StorageError>;

    /// Insert or replace the profile of a subject. Idempotent.
    ///
    /// # Errors
    /// * `Unavailable` - Store failed
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Retrieve the profile of a subject.
    ///
    /// # Errors
    /// * `Unavailable` - Store failed
    async fn find_profile(&self, subject_id: &SubjectId) -> Result<Option<Profile>, StorageError>;

    /// Persist a new refresh token.
    ///
    /// # Errors
    /// * `AlreadyExists` - Token string collides with a stored one
    /// * `Unavailable` - Store failed
    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError>;

    /// Retrieve a refresh token by its string.
    ///
    /// # Errors
    /// * `Unavailable` - Store failed
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StorageError>;

    /// Mark a refresh token revoked. Idempotent for already revoked tokens.
    ///
    /// # Errors
    /// * `NotFound` - Token unknown
    /// * `Unavailable` - Store failed
    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StorageError>;

    /// Revoke `presented` and persist `replacement` as one atomic step.
    ///
    /// The revocation only applies if `presented` is still active at `now`.
    ///
    /// # Returns
    /// `false` if `presented` was unknown, revoked or expired (nothing written)
    ///
    /// # Errors
    /// * `AlreadyExists` - Replacement token string collides (nothing written)
    /// * `Unavailable` - Store failed
    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Remove refresh tokens whose expiry is at or before `now`.
    ///
    /// # Returns
    /// Number of removed tokens
    ///
    /// # Errors
    /// * `Unavailable` - The sweep could not run at all
    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Flush and release store resources.
    async fn close(&self) -> Result<(), StorageError>;
}
