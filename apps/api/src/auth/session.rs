//! Session issuer: turns credentials into a user plus a signed token.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::password::{decoy_hash, hash_password, verify_password};
use crate::auth::token::TokenCodec;
use crate::errors::AppError;
use crate::models::user::User;
use crate::store::UserStore;

pub struct Session {
    pub user: User,
    pub access_token: String,
}

pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenCodec>,
}

impl SessionIssuer {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenCodec>) -> Self {
        Self { users, tokens }
    }

    /// Token lifetime in minutes, as reported to clients.
    pub fn expires_in(&self) -> i64 {
        self.tokens.ttl().num_minutes()
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AppError> {
        validate_credentials(email, password)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let owned = password.to_string();
        let hashed = tokio::task::spawn_blocking(move || hash_password(&owned))
            .await
            .context("Password hashing task failed")??;

        // The unique index still decides a concurrent duplicate; it surfaces as Conflict.
        let user = self.users.create(email, &hashed).await?;
        info!("Registered user {}", user.id);

        self.open_session(user)
    }

    /// Unknown email and wrong password fail identically. An unknown email
    /// still pays for one hash verification against the decoy.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = self.users.find_by_email(email).await?;

        let candidate = password.to_string();
        let stored = user.as_ref().map(|u| u.hashed_password.clone());
        let verified = tokio::task::spawn_blocking(move || {
            verify_password(&candidate, stored.as_deref().unwrap_or_else(|| decoy_hash()))
        })
        .await
        .context("Password verification task failed")?;

        match user {
            Some(user) if verified => self.open_session(user),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    fn open_session(&self, user: User) -> Result<Session, AppError> {
        let access_token = self.tokens.issue_for_subject(&user.email)?;
        Ok(Session { user, access_token })
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation(
            "value is not a valid email address".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password must not be empty".to_string()));
    }
    Ok(())
}

/// Structural check only: one `@`, a non-empty local part and a dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use jsonwebtoken::Algorithm;

    use crate::auth::password::DECOY_PASSWORD;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreError;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(
            b"test-secret",
            Algorithm::HS256,
            Duration::minutes(30),
        ))
    }

    fn issuer() -> (SessionIssuer, Arc<TokenCodec>) {
        let tokens = codec();
        (
            SessionIssuer::new(Arc::new(MemoryStore::new()), tokens.clone()),
            tokens,
        )
    }

    /// Lookups always miss, as when a concurrent registration lands between
    /// the pre-check and the insert.
    struct StaleLookups(MemoryStore);

    #[async_trait]
    impl UserStore for StaleLookups {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn create(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
            UserStore::create(&self.0, email, hashed_password).await
        }
    }

    #[tokio::test]
    async fn test_register_issues_token_for_email() {
        let (issuer, tokens) = issuer();
        let session = issuer.register("a@x.com", "pw").await.unwrap();

        assert_eq!(session.user.email, "a@x.com");
        assert_ne!(session.user.hashed_password, "pw");
        let claims = tokens.verify(&session.access_token).unwrap();
        assert_eq!(claims["sub"], "a@x.com");
        assert_eq!(issuer.expires_in(), 30);
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let (issuer, _) = issuer();
        issuer.register("a@x.com", "pw").await.unwrap();
        let err = issuer.register("a@x.com", "other").await.err().unwrap();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let (issuer, _) = issuer();
        let registered = issuer.register("a@x.com", "pw").await.unwrap();
        let session = issuer.login("a@x.com", "pw").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (issuer, _) = issuer();
        issuer.register("a@x.com", "pw").await.unwrap();

        let wrong_password = issuer.login("a@x.com", "nope").await.err().unwrap();
        let unknown_email = issuer.login("b@x.com", "pw").await.err().unwrap();

        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let (issuer, _) = issuer();
        let err = issuer.register("invalid-email", "pw").await.err().unwrap();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("invalid-email"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@.com"));
    }

    #[tokio::test]
    async fn test_duplicate_past_stale_lookup_conflicts() {
        let issuer = SessionIssuer::new(Arc::new(StaleLookups(MemoryStore::new())), codec());
        issuer.register("a@x.com", "pw").await.unwrap();
        let err = issuer.register("a@x.com", "pw").await.err().unwrap();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_admit_one() {
        let issuer = Arc::new(issuer().0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let issuer = issuer.clone();
            handles.push(tokio::spawn(async move {
                issuer.register("a@x.com", "pw").await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(err) => assert!(matches!(err, AppError::Conflict(_)), "{err}"),
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_unknown_email_never_matches_decoy() {
        let (issuer, _) = issuer();
        let err = issuer
            .login("ghost@x.com", DECOY_PASSWORD)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
