//! In-process store used by unit and router tests.
//!
//! One mutex guards all tables, so every operation (including
//! `record_improvement`) is atomic with respect to the others.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::resume::{HistoryEntry, Resume};
use crate::models::user::User;
use crate::store::{HistoryLedger, ResumeStore, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    resumes: Vec<Resume>,
    history: Vec<HistoryEntry>,
}

impl Tables {
    fn max_version(&self, resume_id: Uuid) -> i32 {
        self.history
            .iter()
            .filter(|h| h.resume_id == resume_id)
            .map(|h| h.version)
            .max()
            .unwrap_or(0)
    }

    fn append(&mut self, resume_id: Uuid, content: &str, version: i32) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            resume_id,
            version,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.history.push(entry.clone());
        entry
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store lock poisoned")
    }

    /// Drops a user row directly, leaving their resumes behind.
    pub fn remove_user(&self, email: &str) {
        self.lock().users.retain(|u| u.email != email);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn create(&self, owner_id: Uuid, title: &str, content: &str) -> Result<Resume, StoreError> {
        let resume = Resume {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            user_id: owner_id,
        };
        self.lock().resumes.push(resume.clone());
        Ok(resume)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        Ok(self.lock().resumes.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Resume>, StoreError> {
        Ok(self
            .lock()
            .resumes
            .iter()
            .filter(|r| r.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: Uuid,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Resume>, StoreError> {
        let mut tables = self.lock();
        Ok(tables.resumes.iter_mut().find(|r| r.id == id).map(|r| {
            if let Some(title) = title {
                r.title = title.to_string();
            }
            if let Some(content) = content {
                r.content = content.to_string();
            }
            r.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Resume>, StoreError> {
        let mut tables = self.lock();
        let Some(pos) = tables.resumes.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        tables.history.retain(|h| h.resume_id != id);
        Ok(Some(tables.resumes.remove(pos)))
    }
}

#[async_trait]
impl HistoryLedger for MemoryStore {
    async fn max_version(&self, resume_id: Uuid) -> Result<i32, StoreError> {
        Ok(self.lock().max_version(resume_id))
    }

    async fn append(
        &self,
        resume_id: Uuid,
        content: &str,
        version: i32,
    ) -> Result<HistoryEntry, StoreError> {
        Ok(self.lock().append(resume_id, content, version))
    }

    async fn list(&self, resume_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self
            .lock()
            .history
            .iter()
            .filter(|h| h.resume_id == resume_id)
            .cloned()
            .collect())
    }

    async fn record_improvement(
        &self,
        resume_id: Uuid,
        content: &str,
    ) -> Result<Option<HistoryEntry>, StoreError> {
        let mut tables = self.lock();
        if !tables.resumes.iter().any(|r| r.id == resume_id) {
            return Ok(None);
        }
        let next_version = tables.max_version(resume_id) + 1;
        let entry = tables.append(resume_id, content, next_version);
        if let Some(resume) = tables.resumes.iter_mut().find(|r| r.id == resume_id) {
            resume.content = content.to_string();
        }
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        UserStore::create(&store, "a@x.com", "hash").await.unwrap();
        let err = UserStore::create(&store, "a@x.com", "hash2").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_max_version_starts_at_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.max_version(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let store = MemoryStore::new();
        let resume = ResumeStore::create(&store, Uuid::new_v4(), "T", "C").await.unwrap();
        store.record_improvement(resume.id, "C2").await.unwrap();
        store.record_improvement(resume.id, "C3").await.unwrap();

        let deleted = ResumeStore::delete(&store, resume.id).await.unwrap();
        assert_eq!(deleted.map(|r| r.id), Some(resume.id));
        assert!(store.list(resume.id).await.unwrap().is_empty());
        assert_eq!(store.max_version(resume.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let store = MemoryStore::new();
        let resume = ResumeStore::create(&store, Uuid::new_v4(), "T", "C").await.unwrap();
        store.record_improvement(resume.id, "C2").await.unwrap();

        let updated = store.update(resume.id, Some("T2"), None).await.unwrap().unwrap();
        assert_eq!(updated.title, "T2");
        assert_eq!(updated.content, "C2");
        assert!(store.update(Uuid::new_v4(), Some("x"), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_improvement_on_missing_resume_is_none() {
        let store = MemoryStore::new();
        assert!(store
            .record_improvement(Uuid::new_v4(), "x")
            .await
            .unwrap()
            .is_none());
    }
}
