use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Access token claims.
///
/// Carries only what a stateless access token needs: who it was issued to
/// and the window it is valid for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject identifier of the principal
    pub sub: String,

    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,

    /// Issued at (Unix timestamp, seconds)
    pub iat: i64,
}

impl Claims {
    /// Build claims for `subject` issued at `now` and valid for `ttl`.
    pub fn for_subject(subject: impl ToString, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Expiration as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A token is usable strictly before its `exp`.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }
}
