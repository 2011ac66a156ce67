use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    groups::service::Attachment,
    middlewares::auth::current_user_id,
};

#[derive(Deserialize, Validate)]
pub struct CreateGroupPayload {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Group name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(length(max = 500, message = "Group description must be at most 500 characters"))]
    #[serde(default)]
    pub description: String,
}

pub async fn create_group(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateGroupPayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid group data: {}", e)))?;

    let group = state
        .groups
        .create_group(user_id, &payload.name, &payload.description)
        .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    session: Session,
    Path(group_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    let view = state.groups.get_group(group_id, user_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

pub async fn leave_group(
    State(state): State<AppState>,
    session: Session,
    Path(group_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    let outcome = state.groups.leave_group(group_id, user_id).await?;
    Ok((StatusCode::OK, Json(outcome)))
}

#[derive(Deserialize, Validate)]
pub struct AddMemberPayload {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,
}

pub async fn add_member(
    State(state): State<AppState>,
    session: Session,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AddMemberPayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid member data: {}", e)))?;

    let member = state
        .groups
        .add_member(group_id, user_id, &payload.username)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    session: Session,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    state
        .groups
        .remove_member(group_id, user_id, target_id)
        .await?;
    Ok((StatusCode::OK, "Member removed"))
}

#[derive(Deserialize)]
pub struct AdminPayload {
    pub user_id: Uuid,
}

pub async fn promote_to_admin(
    State(state): State<AppState>,
    session: Session,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AdminPayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    state
        .groups
        .promote_to_admin(group_id, user_id, payload.user_id)
        .await?;
    Ok((StatusCode::OK, "Member promoted to admin"))
}

pub async fn demote_from_admin(
    State(state): State<AppState>,
    session: Session,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    state
        .groups
        .demote_from_admin(group_id, user_id, target_id)
        .await?;
    Ok((StatusCode::OK, "Admin demoted"))
}

#[derive(Deserialize, Validate)]
pub struct AttachmentPayload {
    #[validate(url(message = "Attachment url is invalid"))]
    pub url: String,
    #[validate(length(min = 1, max = 255, message = "Content type cannot be empty"))]
    pub content_type: String,
}

#[derive(Deserialize, Validate)]
pub struct PostMessagePayload {
    #[validate(length(max = 4000, message = "Messages must be at most 4000 characters"))]
    #[serde(default)]
    pub body: String,
    #[validate(nested)]
    pub attachment: Option<AttachmentPayload>,
}

pub async fn post_message(
    State(state): State<AppState>,
    session: Session,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<PostMessagePayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user_id(&session).await?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid message: {}", e)))?;

    let attachment = payload.attachment.map(|a| Attachment {
        url: a.url,
        content_type: a.content_type,
    });
    let message = state
        .groups
        .post_message(group_id, user_id, &payload.body, attachment)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
