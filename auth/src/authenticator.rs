use std::sync::OnceLock;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

const UNMATCHED_PASSWORD: &str = "unmatched-password-placeholder";

/// Credential and access token coordinator.
///
/// Combines the password hasher with the access token signer so services
/// hold a single handle built once from process configuration.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    access_token_ttl: Duration,
    unmatched_hash: OnceLock<String>,
}

/// A freshly signed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for access token signing
    /// * `access_token_ttl` - Lifetime of issued access tokens
    pub fn new(jwt_secret: &[u8], access_token_ttl: Duration) -> Self {
        Self::with_hasher(PasswordHasher::new(), jwt_secret, access_token_ttl)
    }

    /// Create an authenticator with a preconfigured password hasher.
    pub fn with_hasher(
        password_hasher: PasswordHasher,
        jwt_secret: &[u8],
        access_token_ttl: Duration,
    ) -> Self {
        Self {
            password_hasher,
            jwt_handler: JwtHandler::new(jwt_secret),
            access_token_ttl,
            unmatched_hash: OnceLock::new(),
        }
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against a stored hash. Mismatch is `Ok(false)`.
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is unusable
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        self.password_hasher.verify(password, stored_hash)
    }

    /// Run a full verification for a login that has no stored hash.
    ///
    /// Costs the same as `verify_password` so an unknown login cannot be told
    /// apart from a wrong password by response time. The outcome is discarded.
    ///
    /// # Errors
    /// * `HashingFailed` - The placeholder hash could not be produced
    pub fn verify_password_without_account(&self, password: &str) -> Result<(), PasswordError> {
        let unmatched_hash = self.unmatched_hash()?;
        let _ = self.password_hasher.verify(password, unmatched_hash);
        Ok(())
    }

    // Hashed with this authenticator's own cost parameters on first use.
    fn unmatched_hash(&self) -> Result<&str, PasswordError> {
        if let Some(hash) = self.unmatched_hash.get() {
            return Ok(hash);
        }

        let hash = self.password_hasher.hash(UNMATCHED_PASSWORD)?;
        Ok(self.unmatched_hash.get_or_init(|| hash))
    }

    /// Sign an access token for `subject`, valid for the configured TTL.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token signing failed
    pub fn issue_access_token(&self, subject: &str) -> Result<AccessToken, JwtError> {
        let now = Utc::now();
        let claims = Claims::for_subject(subject, now, self.access_token_ttl);
        let token = self.jwt_handler.encode(&claims)?;

        Ok(AccessToken {
            token,
            expires_at: now + self.access_token_ttl,
        })
    }

    /// Verify an access token and return its subject.
    ///
    /// Purely cryptographic: nothing is looked up.
    ///
    /// # Errors
    /// * `JwtError` - Token is expired, tampered, or signed with another secret
    pub fn verify_access_token(&self, token: &str) -> Result<String, JwtError> {
        self.jwt_handler.decode(token).map(|claims| claims.sub)
    }
}
