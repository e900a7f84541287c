//! Authentication utilities library
//!
//! Provides the credential primitives used by the identity service:
//! - Password hashing (Argon2id)
//! - Access token signing and verification (HS256 JWT)
//! - An `Authenticator` combining both with a fixed access token lifetime
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! assert!(!hasher.verify("other_password", &hash).unwrap());
//! ```
//!
//! ## Access Tokens
//! ```
//! use auth::Authenticator;
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(24));
//!
//! let issued = auth.issue_access_token("3f0c1a52-7c1e-4d55-9b8e-2a9f7c0d1e11").unwrap();
//! let subject = auth.verify_access_token(&issued.token).unwrap();
//! assert_eq!(subject, "3f0c1a52-7c1e-4d55-9b8e-2a9f7c0d1e11");
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AccessToken;
pub use authenticator::Authenticator;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
