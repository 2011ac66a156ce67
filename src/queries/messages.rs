use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::groups::{MediaFile, Message, MessageRef};
use crate::store::{StoreError, StoreResult};

pub async fn list_messages_for_group(
    conn: &mut PgConnection,
    group_id: Uuid,
) -> StoreResult<Vec<MessageRef>> {
    let messages = sqlx::query_as::<_, MessageRef>(
        "SELECT id AS message_id, media_file_id FROM messages \
         WHERE group_id = $1 ORDER BY created_at, id",
    )
    .bind(group_id)
    .fetch_all(conn)
    .await?;

    Ok(messages)
}

pub async fn append_group_message(
    conn: &mut PgConnection,
    group_id: Uuid,
    message_id: Uuid,
) -> StoreResult<()> {
    let result = sqlx::query("UPDATE groups SET messages = array_append(messages, $2) WHERE id = $1")
        .bind(group_id)
        .bind(message_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn insert_media_file(conn: &mut PgConnection, media: &MediaFile) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO media_files (id, group_id, url, content_type, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(media.id)
    .bind(media.group_id)
    .bind(&media.url)
    .bind(&media.content_type)
    .bind(media.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_message(conn: &mut PgConnection, message: &Message) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO messages (id, group_id, sender_id, body, media_file_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(message.id)
    .bind(message.group_id)
    .bind(message.sender_id)
    .bind(&message.body)
    .bind(message.media_file_id)
    .bind(message.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_message(conn: &mut PgConnection, message_id: Uuid) -> StoreResult<()> {
    sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(message_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_media_file(conn: &mut PgConnection, media_id: Uuid) -> StoreResult<()> {
    sqlx::query("DELETE FROM media_files WHERE id = $1")
        .bind(media_id)
        .execute(conn)
        .await?;
    Ok(())
}
