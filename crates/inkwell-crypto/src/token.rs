use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;
use tracing::debug;

use inkwell_types::api::Claims;

/// HS256 is used for both issuance and verification. A token whose header
/// declares any other algorithm fails verification.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("invalid token")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

/// Issues and verifies bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(1),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, user_id: u32) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing("secret is not configured".into()));
        }

        let claims = Claims {
            authorized: true,
            user_id,
            exp: (Utc::now() + self.ttl).timestamp(),
        };

        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!("Issued token for user {}", user_id);
        Ok(token)
    }

    /// Check signature, algorithm and expiry, returning the embedded user id.
    pub fn verify(&self, token: &str) -> Result<u32, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Invalid);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::ImmatureSignature => TokenError::Invalid,
            _ => TokenError::Malformed,
        })?;

        if !data.claims.authorized {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify() {
        let tokens = TokenService::new("test-secret");
        let token = tokens.issue(7).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), 7);
    }

    #[test]
    fn expired_token() {
        let tokens = TokenService::new("test-secret").with_ttl(Duration::seconds(-10));
        let token = tokens.issue(7).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret() {
        let token = TokenService::new("one").issue(7).unwrap();
        let err = TokenService::new("two").verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn rejects_other_algorithm() {
        let claims = Claims {
            authorized: true,
            user_id: 7,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = TokenService::new("test-secret").verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn rejects_unauthorized_claim() {
        let claims = Claims {
            authorized: false,
            user_id: 7,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = TokenService::new("test-secret").verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid));
    }

    #[test]
    fn malformed_token() {
        let tokens = TokenService::new("test-secret");
        assert!(matches!(tokens.verify("garbage"), Err(TokenError::Malformed)));
        assert!(matches!(tokens.verify("a.b.c"), Err(TokenError::Malformed)));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let err = TokenService::new("").issue(1).unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }
}
