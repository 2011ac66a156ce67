use anyhow::anyhow;
use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::sessions::UserSession;

pub const USER_SESSION_KEY: &str = "user";

pub async fn auth_middleware(session: Session, req: Request, next: Next) -> AppResult<Response> {
    // Reject early so handlers can assume a session exists
    current_user_id(&session).await?;
    Ok(next.run(req).await)
}

/// Id of the signed-in user stored by the login flow.
pub async fn current_user_id(session: &Session) -> AppResult<Uuid> {
    let user_session = session
        .get::<UserSession>(USER_SESSION_KEY)
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to read session: {}", e)))?;

    match user_session {
        Some(user) => Ok(user.user_id),
        None => Err(AppError::Unauthorized(anyhow!("User session not found"))),
    }
}
