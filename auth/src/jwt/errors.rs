use thiserror::Error;

/// Error type for access token signing and verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is expired")]
    TokenExpired,

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token algorithm is not accepted")]
    InvalidAlgorithm,

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),
}
