use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime. Expiry is always issue time plus this value.
const TOKEN_TTL_SECS: i64 = 60 * 60 * 24; // 24 hours

/// Represents the claims encoded within a JWT (JSON Web Token).
///
/// Only `sub` is trusted by downstream code; everything else a token may
/// carry is ignored after verification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's unique identifier.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
    /// Issuance timestamp (seconds since epoch).
    pub iat: usize,
}

/// Issues and verifies the signed, time-limited identity tokens used for
/// session authentication.
///
/// The service is constructed once at startup from the configured secret and
/// shared through actix app data, so the secret is never read from the
/// environment in request paths and tests can substitute their own.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Produces a signed token binding `user_id` with a 24-hour expiry.
    pub fn issue(&self, user_id: i32) -> Result<String, AppError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            exp: (now + TOKEN_TTL_SECS) as usize,
            iat: now as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            log::error!("Failed to issue token: {}", e);
            AppError::InternalServerError("Failed to issue token".into())
        })
    }

    /// Verifies a token's signature and expiry and decodes its claims.
    ///
    /// Returns `AppError::Unauthorized` with a "Token expired" message when
    /// the token is past its expiry, and an "Invalid token" message for a
    /// bad signature or malformed structure.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(AppError::from)
    }
}
