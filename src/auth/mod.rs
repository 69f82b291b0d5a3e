//! Token issuing, password hashing and the cookie transport for sessions.

pub mod cookies;
pub mod password;

use chrono::{DateTime, Duration, Utc};
use data_encoding::HEXLOWER;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::Role;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("refresh token reused after rotation")]
    TokenReuse,

    #[error("account disabled")]
    AccountDisabled,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub kind: TokenKind,
    pub jti: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed token and the facts the caller needs to persist or send it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn max_age_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// HS256 signer/verifier configured from `SecurityConfig`
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(security: &SecurityConfig) -> Result<Self, AuthError> {
        if security.jwt_secret.is_empty() {
            return Err(AuthError::Crypto("JWT secret not configured".to_string()));
        }
        let secret = security.jwt_secret.as_bytes();
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: security.jwt_issuer.clone(),
            access_ttl: Duration::minutes(security.access_token_ttl_minutes),
            refresh_ttl: Duration::days(security.refresh_token_ttl_days),
        })
    }

    pub fn issue(&self, user_id: Uuid, role: Role, kind: TokenKind, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user_id,
            role,
            kind,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT generation error: {}", e)))?;

        Ok(IssuedToken { token, jti: claims.jti, expires_at })
    }

    pub fn issue_pair(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, role, TokenKind::Access, now)?,
            refresh: self.issue(user_id, role, TokenKind::Refresh, now)?,
        })
    }

    /// Verify signature, issuer and expiry, and that the token is of `expected` kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.kind != expected {
            return Err(AuthError::InvalidToken(format!(
                "expected {:?} token, got {:?}",
                expected, data.claims.kind
            )));
        }
        Ok(data.claims)
    }
}

/// SHA-256 of a token, the only form in which refresh tokens are stored
pub fn token_fingerprint(token: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn codec() -> TokenCodec {
        let mut security = AppConfig::preset(crate::config::Environment::Development).security;
        security.jwt_secret = "unit-test-secret".to_string();
        TokenCodec::new(&security).unwrap()
    }

    #[test]
    fn issues_and_verifies_access_tokens() {
        let codec = codec();
        let user = Uuid::new_v4();
        let issued = codec.issue(user, Role::Distributor, TokenKind::Access, Utc::now()).unwrap();
        let claims = codec.verify(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Distributor);
        assert_eq!(claims.jti, issued.jti);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let codec = codec();
        let pair = codec.issue_pair(Uuid::new_v4(), Role::Admin, Utc::now()).unwrap();
        assert!(codec.verify(&pair.refresh.token, TokenKind::Access).is_err());
        assert!(codec.verify(&pair.access.token, TokenKind::Refresh).is_err());
        assert!(codec.verify(&pair.refresh.token, TokenKind::Refresh).is_ok());
        assert_ne!(pair.access.jti, pair.refresh.jti);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let codec = codec();
        let issued_at = Utc::now() - Duration::hours(2);
        let issued = codec.issue(Uuid::new_v4(), Role::Admin, TokenKind::Access, issued_at).unwrap();
        assert!(matches!(
            codec.verify(&issued.token, TokenKind::Access),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issued = codec().issue(Uuid::new_v4(), Role::Admin, TokenKind::Access, Utc::now()).unwrap();

        let mut security = AppConfig::preset(crate::config::Environment::Development).security;
        security.jwt_secret = "a-different-secret".to_string();
        let other = TokenCodec::new(&security).unwrap();
        assert!(other.verify(&issued.token, TokenKind::Access).is_err());
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = token_fingerprint("abc");
        assert_eq!(a, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_ne!(a, token_fingerprint("abd"));
    }
}
