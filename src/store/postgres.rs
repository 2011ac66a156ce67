use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{
    FriendStore, MembershipStore, MessageStore, StoreError, StoreResult, UserDirectory,
};
use crate::groups::plan::{UserPatch, Write, WritePlan};
use crate::models::friends::FriendRequest;
use crate::models::groups::{
    Group, GroupMember, GroupSnapshot, MediaFile, Message, MessageRef, SnapshotError,
};
use crate::models::users::{InvitePolicy, UserRecord};
use crate::queries::{friends, groups, messages, users};

/// Postgres-backed store. Group documents keep their reference sets as uuid
/// arrays; each [`WritePlan`] runs inside a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn apply_write(
        conn: &mut PgConnection,
        group_id: Uuid,
        write: &Write,
    ) -> StoreResult<()> {
        match write {
            Write::CreateMember(member) => groups::insert_group_member(conn, member).await?,
            Write::UpdateGroup(patch) => {
                if let Some(created_by) = patch.created_by {
                    groups::set_group_creator(&mut *conn, group_id, created_by).await?;
                }
                for member_id in &patch.add_members {
                    groups::add_member_ref(&mut *conn, group_id, *member_id).await?;
                }
                for member_id in &patch.add_admins {
                    groups::add_admin_ref(&mut *conn, group_id, *member_id).await?;
                }
                for member_id in &patch.remove_admins {
                    groups::remove_admin_ref(&mut *conn, group_id, *member_id).await?;
                }
                for member_id in &patch.remove_members {
                    groups::remove_member_ref(&mut *conn, group_id, *member_id).await?;
                }
            }
            Write::UpdateUser { user_id, patch } => match patch {
                UserPatch::JoinGroup(g) => users::add_joined_group(conn, *user_id, *g).await?,
                UserPatch::LeaveGroup(g) => users::remove_joined_group(conn, *user_id, *g).await?,
            },
            Write::DeleteMember(member_id) => {
                groups::delete_group_member(conn, *member_id).await?
            }
            Write::DeleteMessage(message_id) => {
                messages::delete_message(conn, *message_id).await?
            }
            Write::DeleteMedia(media_id) => messages::delete_media_file(conn, *media_id).await?,
            Write::DeleteGroup => groups::delete_group(conn, group_id).await?,
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn load_group_snapshot(&self, group_id: Uuid) -> StoreResult<GroupSnapshot> {
        // Both reads must come from the same committed state.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let group = groups::get_group(&mut tx, group_id)
            .await?
            .ok_or(StoreError::NotFound)?;
        let members = groups::get_group_members(&mut tx, &group.members).await?;
        tx.commit().await?;

        let missing = group
            .members
            .iter()
            .find(|id| !members.iter().any(|m| m.id == **id));
        if let Some(&member_id) = missing {
            return Err(SnapshotError::MissingMember { group_id, member_id }.into());
        }

        Ok(GroupSnapshot::assemble(group.header(), members, &group.admin)?)
    }

    async fn insert_group(&self, group: &Group, founder: &GroupMember) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        groups::insert_group(&mut tx, group).await?;
        groups::insert_group_member(&mut tx, founder).await?;
        users::add_joined_group(&mut tx, founder.user_id, group.id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn apply(&self, plan: &WritePlan) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        groups::claim_group_version(&mut tx, plan.group_id, plan.expected_version).await?;
        for write in &plan.writes {
            Self::apply_write(&mut tx, plan.group_id, write).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn list_messages_for_group(&self, group_id: Uuid) -> StoreResult<Vec<MessageRef>> {
        let mut conn = self.pool.acquire().await?;
        messages::list_messages_for_group(&mut conn, group_id).await
    }

    async fn insert_message(
        &self,
        message: &Message,
        media: Option<&MediaFile>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        messages::append_group_message(&mut tx, message.group_id, message.id).await?;
        if let Some(media) = media {
            messages::insert_media_file(&mut tx, media).await?;
        }
        messages::insert_message(&mut tx, message).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        let mut conn = self.pool.acquire().await?;
        users::find_user_by_id(&mut conn, user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let mut conn = self.pool.acquire().await?;
        users::find_user_by_username(&mut conn, username).await
    }

    async fn get_accept_group_invites_from(&self, user_id: Uuid) -> StoreResult<InvitePolicy> {
        let mut conn = self.pool.acquire().await?;
        users::get_accept_group_invites_from(&mut conn, user_id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl FriendStore for PgStore {
    async fn insert_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<FriendRequest> {
        let mut conn = self.pool.acquire().await?;
        friends::insert_friend_request(&mut conn, sender_id, receiver_id).await
    }

    async fn get_friend_request(&self, request_id: i32) -> StoreResult<Option<FriendRequest>> {
        let mut conn = self.pool.acquire().await?;
        friends::get_friend_request(&mut conn, request_id).await
    }

    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        friends::delete_friend_request(&mut tx, request.id).await?;
        friends::insert_new_friendship(&mut tx, request.sender_id, request.receiver_id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_friend_request(&self, request_id: i32) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        friends::delete_friend_request(&mut conn, request_id).await
    }
}
