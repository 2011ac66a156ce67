use sqlx::PgConnection;
use uuid::Uuid;

use super::groups::unique_violation_as_duplicate;
use crate::models::friends::FriendRequest;
use crate::store::{StoreError, StoreResult};

pub async fn insert_friend_request(
    conn: &mut PgConnection,
    sender_id: Uuid,
    receiver_id: Uuid,
) -> StoreResult<FriendRequest> {
    // The unique index on the unordered pair rejects requests in either direction.
    let request = sqlx::query_as::<_, FriendRequest>(
        "INSERT INTO friend_requests (sender_id, receiver_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(sender_id)
    .bind(receiver_id)
    .fetch_one(conn)
    .await
    .map_err(unique_violation_as_duplicate)?;

    Ok(request)
}

pub async fn get_friend_request(
    conn: &mut PgConnection,
    request_id: i32,
) -> StoreResult<Option<FriendRequest>> {
    let request =
        sqlx::query_as::<_, FriendRequest>("SELECT * FROM friend_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(conn)
            .await?;

    Ok(request)
}

pub async fn delete_friend_request(conn: &mut PgConnection, request_id: i32) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM friend_requests WHERE id = $1")
        .bind(request_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub async fn insert_new_friendship(
    conn: &mut PgConnection,
    user1_id: Uuid,
    user2_id: Uuid,
) -> StoreResult<()> {
    sqlx::query("INSERT INTO friendships (user1_id, user2_id) VALUES ($1, $2)")
        // One row per pair, smaller id first, so the edge reads the same from both sides.
        .bind(std::cmp::min(user1_id, user2_id))
        .bind(std::cmp::max(user1_id, user2_id))
        .execute(conn)
        .await
        .map_err(unique_violation_as_duplicate)?;

    Ok(())
}
