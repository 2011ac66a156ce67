use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::groups::{Group, GroupHeader, GroupMember};
use crate::store::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub admin: Vec<Uuid>,
    pub version: i64,
}

impl GroupRow {
    pub fn header(&self) -> GroupHeader {
        GroupHeader {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            created_by: self.created_by,
            version: self.version,
        }
    }
}

pub async fn insert_group(conn: &mut PgConnection, group: &Group) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO groups (id, name, description, created_by, members, admin, messages, version, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(group.id)
    .bind(&group.name)
    .bind(&group.description)
    .bind(group.created_by)
    .bind(&group.members)
    .bind(&group.admin)
    .bind(&group.messages)
    .bind(group.version)
    .bind(group.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn get_group(conn: &mut PgConnection, group_id: Uuid) -> StoreResult<Option<GroupRow>> {
    let group = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, description, created_by, members, admin, version FROM groups WHERE id = $1",
    )
    .bind(group_id)
    .fetch_optional(conn)
    .await?;

    Ok(group)
}

/// Member records for `member_ids`, in the order given.
pub async fn get_group_members(
    conn: &mut PgConnection,
    member_ids: &[Uuid],
) -> StoreResult<Vec<GroupMember>> {
    let members = sqlx::query_as::<_, GroupMember>(
        "SELECT id, group_id, user_id, created_at FROM group_members \
         WHERE id = ANY($1) ORDER BY array_position($1, id)",
    )
    .bind(member_ids)
    .fetch_all(conn)
    .await?;

    Ok(members)
}

/// Compare-and-increment on the group's version. Zero rows means the group
/// was changed or deleted since it was read.
pub async fn claim_group_version(
    conn: &mut PgConnection,
    group_id: Uuid,
    expected_version: i64,
) -> StoreResult<()> {
    let result =
        sqlx::query("UPDATE groups SET version = version + 1 WHERE id = $1 AND version = $2")
            .bind(group_id)
            .bind(expected_version)
            .execute(conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::StaleVersion);
    }
    Ok(())
}

pub async fn set_group_creator(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_id: Uuid,
) -> StoreResult<()> {
    sqlx::query("UPDATE groups SET created_by = $2 WHERE id = $1")
        .bind(group_id)
        .bind(member_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn add_member_ref(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_id: Uuid,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE groups SET members = array_append(members, $2) \
         WHERE id = $1 AND NOT ($2 = ANY(members))",
    )
    .bind(group_id)
    .bind(member_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn remove_member_ref(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_id: Uuid,
) -> StoreResult<()> {
    sqlx::query("UPDATE groups SET members = array_remove(members, $2) WHERE id = $1")
        .bind(group_id)
        .bind(member_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn add_admin_ref(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_id: Uuid,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE groups SET admin = array_append(admin, $2) \
         WHERE id = $1 AND NOT ($2 = ANY(admin))",
    )
    .bind(group_id)
    .bind(member_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn remove_admin_ref(
    conn: &mut PgConnection,
    group_id: Uuid,
    member_id: Uuid,
) -> StoreResult<()> {
    sqlx::query("UPDATE groups SET admin = array_remove(admin, $2) WHERE id = $1")
        .bind(group_id)
        .bind(member_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_group_member(conn: &mut PgConnection, member: &GroupMember) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO group_members (id, group_id, user_id, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(member.id)
    .bind(member.group_id)
    .bind(member.user_id)
    .bind(member.created_at)
    .execute(conn)
    .await
    .map_err(unique_violation_as_duplicate)?;
    Ok(())
}

pub async fn delete_group_member(conn: &mut PgConnection, member_id: Uuid) -> StoreResult<()> {
    sqlx::query("DELETE FROM group_members WHERE id = $1")
        .bind(member_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_group(conn: &mut PgConnection, group_id: Uuid) -> StoreResult<()> {
    sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(group_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) fn unique_violation_as_duplicate(e: sqlx::Error) -> StoreError {
    let is_unique_violation = e
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());
    if is_unique_violation {
        StoreError::Duplicate
    } else {
        StoreError::Database(e)
    }
}
