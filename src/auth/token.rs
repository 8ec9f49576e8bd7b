//! Signed, time-limited identity tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::db::models::Role;
use crate::error::AppError;

/// Upper bound on token lifetime: one hundred years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 100;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// The identity a verified token asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("invalid token")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::TokenInvalid,
            other => AppError::Internal(other.to_string()),
        }
    }
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// An empty secret is a configuration error, not a per-request one.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn issue(&self, user_id: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: &str,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            id: user_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            TokenError::Invalid
        })?;

        Ok(Identity {
            id: data.claims.id,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::days(1)).unwrap()
    }

    #[test]
    fn issued_token_verifies_to_same_identity() {
        let tokens = service("secret");
        let token = tokens.issue("user-1", Role::Admin).unwrap();
        let identity = tokens.verify(&token).unwrap();
        assert_eq!(
            identity,
            Identity {
                id: "user-1".into(),
                role: Role::Admin
            }
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = service("secret-a").issue("user-1", Role::User).unwrap();
        assert!(matches!(
            service("secret-b").verify(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn expired_token_is_invalid() {
        let tokens = service("secret");
        let token = tokens
            .issue_at("user-1", Role::User, Utc::now() - Duration::days(2))
            .unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn token_just_inside_ttl_is_valid() {
        let tokens = service("secret");
        let token = tokens
            .issue_at("user-1", Role::User, Utc::now() - Duration::hours(23))
            .unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn malformed_and_tampered_tokens_are_invalid() {
        let tokens = service("secret");
        assert!(tokens.verify("").is_err());
        assert!(tokens.verify("not.a.jwt").is_err());

        let admin = tokens.issue("user-1", Role::Admin).unwrap();
        let forged_payload = admin.split('.').nth(1).unwrap().to_string();
        let token = tokens.issue("user-1", Role::User).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        let tampered = parts.join(".");
        // Payload from one token with the signature of another.
        assert!(matches!(tokens.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error_not_a_panic() {
        let tokens = TokenService::new("secret", Duration::hours(10_000_000_000)).unwrap();
        assert!(matches!(
            tokens.issue("user-1", Role::User),
            Err(TokenError::ExpiryOutOfRange)
        ));
        assert!(matches!(
            AppError::from(TokenError::ExpiryOutOfRange),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn longest_allowed_ttl_still_issues() {
        let tokens = TokenService::new("secret", Duration::hours(MAX_TOKEN_TTL_HOURS)).unwrap();
        let token = tokens.issue("user-1", Role::User).unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            TokenService::new("", Duration::days(1)),
            Err(ConfigError::MissingJwtSecret)
        ));
    }
}
