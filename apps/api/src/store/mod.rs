//! Persistence seams. Each trait is carried in `AppState` as `Arc<dyn …>`
//! so the workflow never depends on a concrete backend.
//!
//! Default backend: `PgStore` (Postgres via sqlx). Tests use `MemoryStore`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::resume::{HistoryEntry, Resume};
use crate::models::user::User;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already exists.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Identity store: user records keyed by unique email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a user with an already-hashed password.
    /// Fails with `StoreError::Conflict` when the email is taken.
    async fn create(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;
}

/// Resume records. Enforces no ownership rules itself.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn create(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Resume, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Resume>, StoreError>;

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError>;

    /// Overwrites the given fields in one atomic write; a `None` field keeps
    /// its stored value. `None` if the id is unknown.
    async fn update(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Resume>, StoreError>;

    /// Removes the resume together with its history. `None` if the id is unknown.
    async fn delete(&self, id: Uuid) -> Result<Option<Resume>, StoreError>;
}

/// Append-only version log for resumes.
#[async_trait]
pub trait HistoryLedger: Send + Sync {
    /// Highest recorded version, 0 if none.
    async fn max_version(&self, resume_id: Uuid) -> Result<i32, StoreError>;

    async fn append(
        &self,
        resume_id: Uuid,
        content: &str,
        version: i32,
    ) -> Result<HistoryEntry, StoreError>;

    /// Entries for a resume. Order is backend-defined.
    async fn list(&self, resume_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Atomically appends `content` as version `max + 1` and mirrors it into
    /// the resume's live content. Concurrent calls on one resume are serialized.
    /// `None` if the resume no longer exists.
    async fn record_improvement(
        &self,
        resume_id: Uuid,
        content: &str,
    ) -> Result<Option<HistoryEntry>, StoreError>;
}
