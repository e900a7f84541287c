use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::errors::EmailError;
use crate::identity::errors::LoginError;
use crate::identity::errors::PasswordPolicyError;
use crate::identity::errors::SubjectIdError;

/// Registered user.
///
/// Never mutated after creation. Everything outside authentication refers
/// to the user through `subject_id`, never through the login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: Login,
    pub password_hash: String,
    pub subject_id: SubjectId,
}

/// User about to be persisted; the store assigns the sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: Login,
    pub password_hash: String,
    pub subject_id: SubjectId,
}

/// Stable opaque identifier of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Generate a new random subject id (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a subject id from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, SubjectIdError> {
        Uuid::parse_str(s)
            .map(SubjectId)
            .map_err(|e| SubjectIdError::InvalidFormat(e.to_string()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Login value type
///
/// 1-255 characters, no control characters, no leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Login(String);

impl Login {
    const MAX_LENGTH: usize = 255;

    /// Create a validated login.
    ///
    /// # Errors
    /// * `Empty` - Login is empty
    /// * `TooLong` - Longer than 255 characters
    /// * `InvalidCharacters` - Control characters or surrounding whitespace
    pub fn new(login: String) -> Result<Self, LoginError> {
        if login.is_empty() {
            return Err(LoginError::Empty);
        }

        let length = login.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(LoginError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        if login.chars().any(char::is_control) || login.trim() != login {
            return Err(LoginError::InvalidCharacters);
        }

        Ok(Self(login))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password as submitted by a caller.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MAX_LENGTH: usize = 1024;

    /// # Errors
    /// * `Empty` - Password is empty
    /// * `TooLong` - Longer than 1024 bytes
    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        if password.is_empty() {
            return Err(PasswordPolicyError::Empty);
        }
        if password.len() > Self::MAX_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: password.len(),
            });
        }
        Ok(Self(password))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Profile attributes of a subject. At most one per subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub subject_id: SubjectId,
    pub email: EmailAddress,
}

/// Stored refresh token.
///
/// Only `revoked` ever changes, and only from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    /// Usable only while not revoked and `now` is strictly before expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Access and refresh token handed out by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub subject_id: SubjectId,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Command to register a new user
#[derive(Debug)]
pub struct RegisterCommand {
    pub login: Login,
    pub password: Password,
}

impl RegisterCommand {
    pub fn new(login: Login, password: Password) -> Self {
        Self { login, password }
    }
}

/// Command to log in with login and password
#[derive(Debug)]
pub struct LoginCommand {
    pub login: Login,
    pub password: Password,
}

impl LoginCommand {
    pub fn new(login: Login, password: Password) -> Self {
        Self { login, password }
    }
}
