use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// What a token lets its bearer do
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Logged-in account session
    User,
    /// Session of an invited signer, scoped to one contract
    Signer,
    /// Emailed invitation link; exchanged for a signer session, never a session itself
    Invite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, or signer id for signer and invite tokens
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<Uuid>,
    /// Unique per token so two invitations issued in the same second differ
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: Uuid, email: impl Into<String>, kind: TokenKind, contract_id: Option<Uuid>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            email: email.into(),
            kind,
            contract_id,
            jti: Uuid::new_v4(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn user(user_id: Uuid, email: impl Into<String>) -> Self {
        let hours = config::config().security.jwt_expiry_hours as i64;
        Self::new(user_id, email, TokenKind::User, None, Duration::hours(hours))
    }

    pub fn signer(signer_id: Uuid, email: impl Into<String>, contract_id: Uuid) -> Self {
        let hours = config::config().security.signer_session_hours as i64;
        Self::new(signer_id, email, TokenKind::Signer, Some(contract_id), Duration::hours(hours))
    }

    pub fn invite(signer_id: Uuid, email: impl Into<String>, contract_id: Uuid, days: i64) -> Self {
        Self::new(signer_id, email, TokenKind::Invite, Some(contract_id), Duration::days(days))
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

/// bcrypt at the configured cost
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, config::config().security.bcrypt_cost)
}

/// False for a wrong password or an unreadable hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_token_roundtrip() {
        let id = Uuid::new_v4();
        let token = generate_jwt(&Claims::user(id, "dir@studio.io")).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.kind, TokenKind::User);
        assert!(claims.contract_id.is_none());
    }

    #[test]
    fn expired_tokens_are_distinguished() {
        let claims = Claims::new(Uuid::new_v4(), "a@b.io", TokenKind::Invite, Some(Uuid::new_v4()), Duration::hours(-2));
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(validate_jwt(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let token = generate_jwt(&Claims::user(Uuid::new_v4(), "a@b.io")).unwrap();
        let tampered = format!("{}x", token);
        assert!(matches!(validate_jwt(&tampered), Err(JwtError::Invalid(_))));
        assert!(matches!(validate_jwt("not-a-token"), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn invites_issued_together_differ() {
        let (signer, contract) = (Uuid::new_v4(), Uuid::new_v4());
        let a = generate_jwt(&Claims::invite(signer, "s@x.io", contract, 7)).unwrap();
        let b = generate_jwt(&Claims::invite(signer, "s@x.io", contract, 7)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn passwords_hash_and_verify() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-hash"));
    }
}
