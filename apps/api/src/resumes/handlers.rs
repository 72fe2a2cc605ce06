//! Axum route handlers for the Resume API. All routes require a bearer token.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::CurrentUser;
use crate::errors::AppError;
use crate::models::resume::{HistoryEntry, Resume};
use crate::resumes::workflow::ResumeChanges;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImproveRequest {
    pub content: String,
}

/// Body of a successful improve: the recorded snapshot's content.
#[derive(Debug, Serialize)]
pub struct ImproveResponse {
    pub content: String,
}

/// POST /resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let resume = state
        .workflow
        .create_resume(&req.title, &req.content, &user)
        .await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Resume>>, AppError> {
    Ok(Json(state.workflow.list_resumes(&user).await?))
}

/// GET /resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Resume>, AppError> {
    Ok(Json(state.workflow.get_resume(id, &user).await?))
}

/// PUT /resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateResumeRequest>,
) -> Result<Json<Resume>, AppError> {
    let changes = ResumeChanges {
        title: req.title,
        content: req.content,
    };
    Ok(Json(state.workflow.update_resume(id, changes, &user).await?))
}

/// DELETE /resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.workflow.delete_resume(id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /resumes/:id/improve
///
/// Records a new history version and makes it the live content.
pub async fn handle_improve_resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ImproveRequest>,
) -> Result<Json<ImproveResponse>, AppError> {
    let entry = state
        .workflow
        .improve_resume(id, &req.content, &user)
        .await?;
    Ok(Json(ImproveResponse {
        content: entry.content,
    }))
}

/// GET /resumes/:id/history
pub async fn handle_resume_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    Ok(Json(state.workflow.get_resume_history(id, &user).await?))
}
