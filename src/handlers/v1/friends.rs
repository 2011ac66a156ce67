use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tower_sessions::Session;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    middlewares::auth::current_user_id,
};

#[derive(serde::Deserialize, Validate)]
pub struct FriendRequestData {
    #[validate(length(min = 1, message = "Receiver ID cannot be empty"))]
    pub receiver_id: String,
}

pub async fn send_friend_request(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<FriendRequestData>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid friend request data: {}", e)))?;

    let receiver_id = Uuid::parse_str(payload.receiver_id.trim())
        .map_err(|_| AppError::BadRequest(anyhow!("Invalid receiver ID format")))?;

    let request = state
        .friends
        .send_friend_request(user_id, receiver_id)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn accept_friend_request(
    State(state): State<AppState>,
    session: Session,
    Path(request_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    state
        .friends
        .accept_friend_request(user_id, request_id)
        .await?;
    Ok((StatusCode::OK, "Friend request accepted"))
}

pub async fn decline_friend_request(
    State(state): State<AppState>,
    session: Session,
    Path(request_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    state
        .friends
        .decline_friend_request(user_id, request_id)
        .await?;
    Ok((StatusCode::OK, "Friend request declined"))
}
