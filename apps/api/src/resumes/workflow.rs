//! Access-controlled resume workflow.
//!
//! Every operation takes the resolved caller. A resume id is first checked
//! for existence (`NotFound`), then for ownership (`Forbidden`), so an
//! unknown id never reveals anything about other users' data.
//!
//! Improvements go through `HistoryLedger::record_improvement`, which
//! assigns `max(version) + 1`, appends the snapshot and mirrors it into the
//! resume in one atomic step. The live content therefore always equals the
//! highest version's content once any improvement exists.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{HistoryEntry, Resume};
use crate::models::user::User;
use crate::resumes::improver::ContentImprover;
use crate::store::{HistoryLedger, ResumeStore, UserStore};

/// Single ownership guard used by every resume operation.
pub fn assert_owner(resume: &Resume, actor: &User) -> Result<(), AppError> {
    if resume.user_id == actor.id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn resume_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resume {id} not found"))
}

/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Default)]
pub struct ResumeChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct ResumeWorkflow {
    users: Arc<dyn UserStore>,
    resumes: Arc<dyn ResumeStore>,
    history: Arc<dyn HistoryLedger>,
    improver: Arc<dyn ContentImprover>,
}

impl ResumeWorkflow {
    pub fn new(
        users: Arc<dyn UserStore>,
        resumes: Arc<dyn ResumeStore>,
        history: Arc<dyn HistoryLedger>,
        improver: Arc<dyn ContentImprover>,
    ) -> Self {
        Self {
            users,
            resumes,
            history,
            improver,
        }
    }

    async fn owned_resume(&self, id: Uuid, actor: &User) -> Result<Resume, AppError> {
        let resume = self
            .resumes
            .get(id)
            .await?
            .ok_or_else(|| resume_not_found(id))?;
        assert_owner(&resume, actor)?;
        Ok(resume)
    }

    pub async fn create_resume(
        &self,
        title: &str,
        content: &str,
        actor: &User,
    ) -> Result<Resume, AppError> {
        let resume = self.resumes.create(actor.id, title, content).await?;
        info!("Created resume {} for user {}", resume.id, actor.id);
        Ok(resume)
    }

    pub async fn list_resumes(&self, actor: &User) -> Result<Vec<Resume>, AppError> {
        // A token may outlive its account.
        let owner = self
            .users
            .find_by_email(&actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(self.resumes.list_by_owner(owner.id).await?)
    }

    pub async fn get_resume(&self, id: Uuid, actor: &User) -> Result<Resume, AppError> {
        self.owned_resume(id, actor).await
    }

    pub async fn update_resume(
        &self,
        id: Uuid,
        changes: ResumeChanges,
        actor: &User,
    ) -> Result<Resume, AppError> {
        self.owned_resume(id, actor).await?;

        let updated = self
            .resumes
            .update(id, changes.title.as_deref(), changes.content.as_deref())
            .await?
            .ok_or_else(|| resume_not_found(id))?;
        info!("Updated resume {id}");
        Ok(updated)
    }

    /// Not idempotent: a second call reports `NotFound`.
    pub async fn delete_resume(&self, id: Uuid, actor: &User) -> Result<(), AppError> {
        self.owned_resume(id, actor).await?;
        self.resumes
            .delete(id)
            .await?
            .ok_or_else(|| resume_not_found(id))?;
        info!("Deleted resume {id}");
        Ok(())
    }

    pub async fn improve_resume(
        &self,
        id: Uuid,
        new_content: &str,
        actor: &User,
    ) -> Result<HistoryEntry, AppError> {
        self.owned_resume(id, actor).await?;

        let improved = self.improver.improve(new_content);
        let entry = self
            .history
            .record_improvement(id, &improved)
            .await?
            .ok_or_else(|| resume_not_found(id))?;

        info!("Recorded version {} for resume {id}", entry.version);
        Ok(entry)
    }

    /// Entries in ascending version order; empty if never improved.
    pub async fn get_resume_history(
        &self,
        id: Uuid,
        actor: &User,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        self.owned_resume(id, actor).await?;
        let mut entries = self.history.list(id).await?;
        entries.sort_by_key(|e| e.version);
        Ok(entries)
    }
}
