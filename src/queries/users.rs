use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::users::{InvitePolicy, UserRecord};
use crate::store::StoreResult;

// Friendships are stored once per pair, so both columns are searched.
const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.accept_group_invites_from, u.joined_groups, u.created_at,
        ARRAY(
            SELECT CASE WHEN f.user1_id = u.id THEN f.user2_id ELSE f.user1_id END
            FROM friendships f
            WHERE f.user1_id = u.id OR f.user2_id = u.id
        ) AS friends
    FROM users u
"#;

pub async fn find_user_by_id(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> StoreResult<Option<UserRecord>> {
    let sql = format!("{SELECT_USER} WHERE u.id = $1");
    let user = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(user)
}

pub async fn find_user_by_username(
    conn: &mut PgConnection,
    username: &str,
) -> StoreResult<Option<UserRecord>> {
    let sql = format!("{SELECT_USER} WHERE u.username = $1");
    let user = sqlx::query_as::<_, UserRecord>(&sql)
        .bind(username)
        .fetch_optional(conn)
        .await?;

    Ok(user)
}

pub async fn get_accept_group_invites_from(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> StoreResult<Option<InvitePolicy>> {
    let policy = sqlx::query_scalar::<_, InvitePolicy>(
        "SELECT accept_group_invites_from FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(policy)
}

pub async fn add_joined_group(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE users SET joined_groups = array_append(joined_groups, $2) \
         WHERE id = $1 AND NOT ($2 = ANY(joined_groups))",
    )
    .bind(user_id)
    .bind(group_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn remove_joined_group(
    conn: &mut PgConnection,
    user_id: Uuid,
    group_id: Uuid,
) -> StoreResult<()> {
    sqlx::query("UPDATE users SET joined_groups = array_remove(joined_groups, $2) WHERE id = $1")
        .bind(user_id)
        .bind(group_id)
        .execute(conn)
        .await?;
    Ok(())
}
