#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::groups::plan::WritePlan;
use crate::models::friends::FriendRequest;
use crate::models::groups::{
    Group, GroupMember, GroupSnapshot, MediaFile, Message, MessageRef, SnapshotError,
};
use crate::models::users::{InvitePolicy, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("group version changed since the snapshot was read")]
    StaleVersion,
    #[error("record already exists")]
    Duplicate,
    #[error("malformed group document: {0}")]
    Malformed(#[from] SnapshotError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Group and GroupMember documents. All lifecycle mutations go through
/// [`MembershipStore::apply`].
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Loads the group with its members, admins and creator expanded.
    /// Missing groups yield [`StoreError::NotFound`].
    async fn load_group_snapshot(&self, group_id: Uuid) -> StoreResult<GroupSnapshot>;

    /// Persists a freshly created group together with its founding member
    /// and records the group in the founder's `joined_groups`.
    async fn insert_group(&self, group: &Group, founder: &GroupMember) -> StoreResult<()>;

    /// Claims `plan.expected_version` and then executes the writes in order.
    async fn apply(&self, plan: &WritePlan) -> StoreResult<()>;
}

/// Read side of the message and media collections. Deletions are part of a
/// [`WritePlan`].
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages of a group in posting order. Unknown groups yield an empty list.
    async fn list_messages_for_group(&self, group_id: Uuid) -> StoreResult<Vec<MessageRef>>;

    /// Inserts the message (and its attachment, if any) and appends it to the
    /// group's `messages`.
    async fn insert_message(&self, message: &Message, media: Option<&MediaFile>)
        -> StoreResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn get_accept_group_invites_from(&self, user_id: Uuid) -> StoreResult<InvitePolicy>;
}

#[async_trait]
pub trait FriendStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] if a request between the two users
    /// already exists in either direction.
    async fn insert_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<FriendRequest>;

    async fn get_friend_request(&self, request_id: i32) -> StoreResult<Option<FriendRequest>>;

    /// Deletes the request and writes both friendship edges in one step.
    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<()>;

    async fn delete_friend_request(&self, request_id: i32) -> StoreResult<()>;
}
