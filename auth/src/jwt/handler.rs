use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Serialize;

use super::claims::Claims;
use super::errors::JwtError;

/// HS256 signer and verifier for access tokens.
///
/// The secret is copied into the keys at construction and never exposed
/// again.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key.
    ///
    /// # Arguments
    /// * `secret` - HMAC secret, at least 32 bytes recommended
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign claims into a compact JWT.
    ///
    /// # Errors
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify signature, algorithm and expiry, then return the claims.
    ///
    /// # Errors
    /// * `TokenExpired` - `exp` is not in the future
    /// * `InvalidSignature` - Signed with another secret or payload altered
    /// * `InvalidAlgorithm` - Header names an algorithm other than HS256
    /// * `MissingClaim` - `sub` or `exp` absent
    /// * `Malformed` - Not a decodable JWT
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                    ErrorKind::InvalidAlgorithm => JwtError::InvalidAlgorithm,
                    ErrorKind::MissingRequiredClaim(claim) => JwtError::MissingClaim(claim.clone()),
                    _ => JwtError::Malformed(e.to_string()),
                }
            })?;

        // jsonwebtoken accepts exp == now; expiry here is exclusive.
        if token_data.claims.is_expired(Utc::now().timestamp()) {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde::Serialize;

    use super::*;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    fn claims_for(subject: &str, ttl: Duration) -> Claims {
        Claims::for_subject(subject, Utc::now(), ttl)
    }

    #[test]
    fn test_encode_and_decode() {
        let handler = JwtHandler::new(SECRET);
        let claims = claims_for("user123", Duration::hours(1));

        let token = handler.encode(&claims).expect("Failed to encode token");
        assert_eq!(token.split('.').count(), 3);

        let decoded = handler.decode(&token).expect("Failed to decode token");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_decode_invalid_token() {
        let handler = JwtHandler::new(SECRET);

        let result = handler.decode("invalid.token.here");
        assert!(matches!(result, Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let handler1 = JwtHandler::new(b"secret1_at_least_32_bytes_long_key!");
        let handler2 = JwtHandler::new(b"secret2_at_least_32_bytes_long_key!");

        let token = handler1
            .encode(&claims_for("user123", Duration::hours(1)))
            .unwrap();

        assert_eq!(handler2.decode(&token), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_decode_expired() {
        let handler = JwtHandler::new(SECRET);
        let token = handler
            .encode(&claims_for("user123", Duration::seconds(-5)))
            .unwrap();

        assert_eq!(handler.decode(&token), Err(JwtError::TokenExpired));
    }

    #[test]
    fn test_decode_expiring_now() {
        let handler = JwtHandler::new(SECRET);
        let token = handler
            .encode(&claims_for("user123", Duration::zero()))
            .unwrap();

        assert_eq!(handler.decode(&token), Err(JwtError::TokenExpired));
    }

    #[test]
    fn test_decode_rejects_other_algorithm() {
        let handler = JwtHandler::new(SECRET);
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims_for("user123", Duration::hours(1)),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(handler.decode(&token), Err(JwtError::InvalidAlgorithm));
    }

    #[test]
    fn test_decode_rejects_unsigned_token() {
        let handler = JwtHandler::new(SECRET);
        let token = handler
            .encode(&claims_for("user123", Duration::hours(1)))
            .unwrap();
        let payload = token.split('.').nth(1).unwrap();

        // {"alg":"none","typ":"JWT"}
        let forged = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{}.", payload);

        assert!(handler.decode(&forged).is_err());
    }

    #[test]
    fn test_decode_rejects_swapped_payload() {
        let handler = JwtHandler::new(SECRET);
        let victim = handler
            .encode(&claims_for("victim", Duration::hours(1)))
            .unwrap();
        let attacker = handler
            .encode(&claims_for("attacker", Duration::hours(1)))
            .unwrap();

        let parts: Vec<&str> = attacker.split('.').collect();
        let victim_payload = victim.split('.').nth(1).unwrap();
        let forged = format!("{}.{}.{}", parts[0], victim_payload, parts[2]);

        assert_eq!(handler.decode(&forged), Err(JwtError::InvalidSignature));
    }

    #[test]
    fn test_decode_missing_subject() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let handler = JwtHandler::new(SECRET);
        let token = handler
            .encode(&NoSubject {
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            })
            .unwrap();

        assert!(matches!(
            handler.decode(&token),
            Err(JwtError::MissingClaim(_)) | Err(JwtError::Malformed(_))
        ));
    }
}
