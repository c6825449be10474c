//! JWT Token Service
//!
//! Issues and validates the stateless bearer tokens handed out at register/login.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOKEN_ISSUER: &str = "clatract-api";
/// Tokens expire exactly 7 days after issuance.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to encode token: {0}")]
    Encode(jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    pub iss: String,
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: &str, email: &str) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(TokenError::Encode)
    }

    /// Validates signature, issuer and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}
