use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

const CREDENTIALS_REJECTED: &str = "Could not validate credentials";

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
///
/// The token's `sub` claim is an email; the user is re-read from the
/// identity store so tokens for deleted accounts stop working.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify(token)?;

        let email = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Unauthorized(CREDENTIALS_REJECTED.to_string()))?;

        let user = state
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(CREDENTIALS_REJECTED.to_string()))?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized(CREDENTIALS_REJECTED.to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized(CREDENTIALS_REJECTED.to_string()));
    }
    Ok(token.trim())
}
