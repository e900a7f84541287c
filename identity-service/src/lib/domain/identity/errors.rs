use thiserror::Error;

/// Error for SubjectId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubjectIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for Login validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Login must not be empty")]
    Empty,

    #[error("Login too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("Login must not contain control characters or surrounding whitespace")]
    InvalidCharacters,
}

/// Error for plaintext password policy failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password must not be empty")]
    Empty,

    #[error("Password too long: maximum {max} bytes, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Failures reported by an `IdentityRepository`.
///
/// Messages carry backend context for logs; the domain only branches on the
/// variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

/// Top-level error for identity operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid subject id: {0}")]
    InvalidSubjectId(#[from] SubjectIdError),

    #[error("Invalid login: {0}")]
    InvalidLogin(#[from] LoginError),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] PasswordPolicyError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    // Domain-level errors
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    // Infrastructure errors
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Token signing failed: {0}")]
    SigningFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for IdentityError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(what) => IdentityError::AlreadyExists(what),
            StorageError::NotFound(what) => IdentityError::NotFound(what),
            StorageError::Unavailable(reason) => IdentityError::StorageUnavailable(reason),
            StorageError::Corrupt(reason) => IdentityError::Internal(reason),
        }
    }
}

impl From<auth::JwtError> for IdentityError {
    fn from(err: auth::JwtError) -> Self {
        IdentityError::SigningFailure(err.to_string())
    }
}

impl From<auth::PasswordError> for IdentityError {
    fn from(err: auth::PasswordError) -> Self {
        IdentityError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for IdentityError {
    fn from(err: tokio::task::JoinError) -> Self {
        IdentityError::Internal(format!("Blocking task failed: {}", err))
    }
}
