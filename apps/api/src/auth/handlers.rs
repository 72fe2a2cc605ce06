use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::session::Session;
use crate::errors::AppError;
use crate::models::user::UserResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenWithUser {
    pub access_token: String,
    pub token_type: &'static str,
    /// Minutes until the token expires.
    pub expires_in: i64,
    pub user: UserResponse,
}

fn token_response(state: &AppState, session: Session) -> TokenWithUser {
    TokenWithUser {
        user: UserResponse::from(&session.user),
        access_token: session.access_token,
        token_type: "bearer",
        expires_in: state.sessions.expires_in(),
    }
}

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<TokenWithUser>), AppError> {
    let session = state.sessions.register(&req.email, &req.password).await?;
    Ok((StatusCode::CREATED, Json(token_response(&state, session))))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<TokenWithUser>, AppError> {
    let session = state.sessions.login(&req.email, &req.password).await?;
    Ok(Json(token_response(&state, session)))
}
