//! Signed bearer tokens (HMAC JWT).
//!
//! `issue` stamps `exp = now + ttl` into the claims before signing.
//! `verify` separates an expired token from every other failure.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::Config;

/// Key-value payload carried inside a token.
pub type Claims = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed payload or unexpected algorithm.
    #[error("Invalid token")]
    Invalid,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            algorithm,
            ttl,
        }
    }

    /// Builds the codec from `SECRET_KEY`, `ALGORITHM` and `JWT_EXPIRE_MINUTES`.
    /// Only the HMAC family works with a shared secret.
    pub fn from_config(config: &Config) -> Result<Self> {
        let algorithm = Algorithm::from_str(&config.jwt_algorithm)
            .with_context(|| format!("Unknown signing algorithm '{}'", config.jwt_algorithm))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            bail!(
                "Signing algorithm {algorithm:?} is not supported; use HS256, HS384 or HS512"
            );
        }
        if config.secret_key.is_empty() {
            bail!("SECRET_KEY must not be empty");
        }
        let ttl = Duration::try_minutes(config.jwt_expire_minutes).with_context(|| {
            format!("Token lifetime of {} minutes is out of range", config.jwt_expire_minutes)
        })?;
        Ok(Self::new(config.secret_key.as_bytes(), algorithm, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, mut claims: Claims) -> Result<String> {
        let expires = Utc::now()
            .checked_add_signed(self.ttl)
            .context("Token expiry is out of range")?;
        claims.insert("exp".to_string(), Value::from(expires.timestamp()));
        encode(&Header::new(self.algorithm), &claims, &self.encoding).context("Failed to sign token")
    }

    /// Convenience for the usual `{ "sub": <email> }` payload.
    pub fn issue_for_subject(&self, subject: &str) -> Result<String> {
        let mut claims = Claims::new();
        claims.insert("sub".to_string(), Value::from(subject));
        self.issue(claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
