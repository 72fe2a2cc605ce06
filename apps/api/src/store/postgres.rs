use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::models::resume::{HistoryEntry, Resume};
use crate::models::user::User;
use crate::store::{HistoryLedger, ResumeStore, StoreError, UserStore};

const RESUME_COLUMNS: &str = "id, title, content, user_id";
const HISTORY_COLUMNS: &str = "id, resume_id, version, content, created_at";

/// Postgres-backed implementation of every store seam.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique-constraint violation to `StoreError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message()),
        _ => StoreError::Database(err),
    }
}

async fn max_version_in<'e, E: PgExecutor<'e>>(executor: E, resume_id: Uuid) -> Result<i32, StoreError> {
    let current: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM resume_history WHERE resume_id = $1")
            .bind(resume_id)
            .fetch_one(executor)
            .await?;
    Ok(current.unwrap_or(0))
}

async fn append_in<'e, E: PgExecutor<'e>>(
    executor: E,
    resume_id: Uuid,
    content: &str,
    version: i32,
) -> Result<HistoryEntry, StoreError> {
    sqlx::query_as::<_, HistoryEntry>(&format!(
        "INSERT INTO resume_history (id, resume_id, version, content) \
         VALUES ($1, $2, $3, $4) RETURNING {HISTORY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(resume_id)
    .bind(version)
    .bind(content)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        conflict_on_unique(e, || {
            format!("Version {version} already exists for resume {resume_id}")
        })
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "User already exists".to_string()))
    }
}

#[async_trait]
impl ResumeStore for PgStore {
    async fn create(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Resume, StoreError> {
        Ok(sqlx::query_as::<_, Resume>(&format!(
            "INSERT INTO resumes (id, user_id, title, content) \
             VALUES ($1, $2, $3, $4) RETURNING {RESUME_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        Ok(
            sqlx::query_as::<_, Resume>(&format!(
                "SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError> {
        Ok(sqlx::query_as::<_, Resume>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Resume>, StoreError> {
        // Merged in SQL so a concurrent improvement is never overwritten with stale content.
        Ok(sqlx::query_as::<_, Resume>(&format!(
            "UPDATE resumes SET title = COALESCE($2, title), content = COALESCE($3, content), \
             updated_at = now() \
             WHERE id = $1 RETURNING {RESUME_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // History goes first so the cascade does not depend on FK options.
        let removed = sqlx::query("DELETE FROM resume_history WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let resume = sqlx::query_as::<_, Resume>(&format!(
            "DELETE FROM resumes WHERE id = $1 RETURNING {RESUME_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Deleted resume {id} with {removed} history entries");
        Ok(resume)
    }
}

#[async_trait]
impl HistoryLedger for PgStore {
    async fn max_version(&self, resume_id: Uuid) -> Result<i32, StoreError> {
        max_version_in(&self.pool, resume_id).await
    }

    async fn append(
        &self,
        resume_id: Uuid,
        content: &str,
        version: i32,
    ) -> Result<HistoryEntry, StoreError> {
        append_in(&self.pool, resume_id, content, version).await
    }

    async fn list(&self, resume_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(sqlx::query_as::<_, HistoryEntry>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM resume_history WHERE resume_id = $1 ORDER BY version ASC"
        ))
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn record_improvement(
        &self,
        resume_id: Uuid,
        content: &str,
    ) -> Result<Option<HistoryEntry>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent improvements of the same resume.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM resumes WHERE id = $1 FOR UPDATE")
                .bind(resume_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let next_version = max_version_in(&mut *tx, resume_id).await? + 1;
        let entry = append_in(&mut *tx, resume_id, content, next_version).await?;

        sqlx::query("UPDATE resumes SET content = $2, updated_at = now() WHERE id = $1")
            .bind(resume_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(entry))
    }
}
