use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
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

/// In-process document store used to exercise the services. Every collection
/// is a concurrent map; the group entry lock serialises plans and snapshot
/// reads for that group.
#[derive(Clone, Default)]
pub struct MemoryStore {
    groups: Arc<DashMap<Uuid, Group>>,
    members: Arc<DashMap<Uuid, GroupMember>>,
    users: Arc<DashMap<Uuid, UserRecord>>,
    messages: Arc<DashMap<Uuid, Message>>,
    media: Arc<DashMap<Uuid, MediaFile>>,
    friend_requests: Arc<DashMap<i32, FriendRequest>>,
    last_request_id: Arc<AtomicI32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn user(&self, user_id: Uuid) -> Option<UserRecord> {
        self.users.get(&user_id).map(|u| u.value().clone())
    }

    pub fn group(&self, group_id: Uuid) -> Option<Group> {
        self.groups.get(&group_id).map(|g| g.value().clone())
    }

    pub fn member(&self, member_id: Uuid) -> Option<GroupMember> {
        self.members.get(&member_id).map(|m| m.value().clone())
    }

    pub fn replace_member(&self, member: GroupMember) {
        self.members.insert(member.id, member);
    }

    pub fn has_message(&self, message_id: Uuid) -> bool {
        self.messages.contains_key(&message_id)
    }

    pub fn has_media(&self, media_id: Uuid) -> bool {
        self.media.contains_key(&media_id)
    }

    pub fn set_invite_policy(&self, user_id: Uuid, policy: InvitePolicy) {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.accept_group_invites_from = policy;
        }
    }

    /// Writes both friendship edges.
    pub fn befriend(&self, a: Uuid, b: Uuid) -> StoreResult<()> {
        for (user, friend) in [(a, b), (b, a)] {
            let mut record = self.users.get_mut(&user).ok_or(StoreError::NotFound)?;
            if !record.friends.contains(&friend) {
                record.friends.push(friend);
            }
        }
        Ok(())
    }

    fn update_user(&self, user_id: Uuid, patch: UserPatch) -> StoreResult<()> {
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        match patch {
            UserPatch::JoinGroup(group_id) => {
                if !user.joined_groups.contains(&group_id) {
                    user.joined_groups.push(group_id);
                }
            }
            UserPatch::LeaveGroup(group_id) => user.joined_groups.retain(|g| *g != group_id),
        }
        Ok(())
    }

    fn delete_message(&self, message_id: Uuid) {
        if let Some((_, message)) = self.messages.remove(&message_id) {
            if let Some(media_id) = message.media_file_id {
                self.media.remove(&media_id);
            }
        }
    }

    /// Writes that live outside the group document itself.
    fn apply_record_write(&self, write: &Write) -> StoreResult<()> {
        match write {
            Write::CreateMember(member) => {
                self.members.insert(member.id, member.clone());
            }
            Write::UpdateUser { user_id, patch } => self.update_user(*user_id, *patch)?,
            Write::DeleteMember(member_id) => {
                self.members.remove(member_id);
            }
            Write::DeleteMessage(message_id) => {
                self.messages.remove(message_id);
            }
            Write::DeleteMedia(media_id) => {
                self.media.remove(media_id);
            }
            Write::UpdateGroup(_) | Write::DeleteGroup => {}
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn load_group_snapshot(&self, group_id: Uuid) -> StoreResult<GroupSnapshot> {
        // The read guard keeps plans for this group out until the snapshot is built.
        let group = self.groups.get(&group_id).ok_or(StoreError::NotFound)?;
        let members = group
            .members
            .iter()
            .map(|&member_id| {
                self.member(member_id)
                    .ok_or(SnapshotError::MissingMember { group_id, member_id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GroupSnapshot::assemble(group.header(), members, &group.admin)?)
    }

    async fn insert_group(&self, group: &Group, founder: &GroupMember) -> StoreResult<()> {
        if !self.users.contains_key(&founder.user_id) {
            return Err(StoreError::NotFound);
        }
        self.members.insert(founder.id, founder.clone());
        self.groups.insert(group.id, group.clone());
        self.update_user(founder.user_id, UserPatch::JoinGroup(group.id))
    }

    async fn apply(&self, plan: &WritePlan) -> StoreResult<()> {
        // The entry stays locked for the whole plan, so a snapshot sees the
        // group either before the plan or after it.
        let mut entry = match self.groups.entry(plan.group_id) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => return Err(StoreError::NotFound),
        };
        if entry.get().version != plan.expected_version {
            return Err(StoreError::StaleVersion);
        }
        entry.get_mut().version += 1;

        let mut dissolve = false;
        for write in &plan.writes {
            match write {
                Write::UpdateGroup(patch) => patch.apply_to(entry.get_mut()),
                Write::DeleteGroup => dissolve = true,
                other => self.apply_record_write(other)?,
            }
        }

        if dissolve {
            // Sweep messages posted after the plan listed them.
            let group = entry.remove();
            for message_id in &group.messages {
                self.delete_message(*message_id);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_messages_for_group(&self, group_id: Uuid) -> StoreResult<Vec<MessageRef>> {
        let Some(group) = self.group(group_id) else {
            return Ok(Vec::new());
        };
        Ok(group
            .messages
            .iter()
            .filter_map(|id| self.messages.get(id))
            .map(|m| MessageRef {
                message_id: m.id,
                media_file_id: m.media_file_id,
            })
            .collect())
    }

    async fn insert_message(
        &self,
        message: &Message,
        media: Option<&MediaFile>,
    ) -> StoreResult<()> {
        let mut group = self
            .groups
            .get_mut(&message.group_id)
            .ok_or(StoreError::NotFound)?;
        if let Some(media) = media {
            self.media.insert(media.id, media.clone());
        }
        self.messages.insert(message.id, message.clone());
        group.messages.push(message.id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.user(user_id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn get_accept_group_invites_from(&self, user_id: Uuid) -> StoreResult<InvitePolicy> {
        self.users
            .get(&user_id)
            .map(|u| u.accept_group_invites_from)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl FriendStore for MemoryStore {
    async fn insert_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<FriendRequest> {
        let exists = self.friend_requests.iter().any(|r| {
            (r.sender_id == sender_id && r.receiver_id == receiver_id)
                || (r.sender_id == receiver_id && r.receiver_id == sender_id)
        });
        if exists {
            return Err(StoreError::Duplicate);
        }

        let request = FriendRequest {
            id: self.last_request_id.fetch_add(1, Ordering::SeqCst) + 1,
            sender_id,
            receiver_id,
            created_at: Utc::now(),
        };
        self.friend_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_friend_request(&self, request_id: i32) -> StoreResult<Option<FriendRequest>> {
        Ok(self.friend_requests.get(&request_id).map(|r| r.value().clone()))
    }

    async fn accept_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        self.friend_requests
            .remove(&request.id)
            .ok_or(StoreError::NotFound)?;
        self.befriend(request.sender_id, request.receiver_id)
    }

    async fn delete_friend_request(&self, request_id: i32) -> StoreResult<()> {
        self.friend_requests
            .remove(&request_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::plan::GroupPatch;

    async fn seeded() -> (MemoryStore, Group, GroupMember) {
        let store = MemoryStore::new();
        let user = UserRecord::new("ada");
        store.insert_user(user.clone());

        let group_id = Uuid::new_v4();
        let founder = GroupMember::new(group_id, user.id);
        let group = Group {
            id: group_id,
            name: "g".to_string(),
            description: String::new(),
            created_by: founder.id,
            members: vec![founder.id],
            admin: vec![founder.id],
            messages: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        };
        store.insert_group(&group, &founder).await.unwrap();
        (store, group, founder)
    }

    #[tokio::test]
    async fn insert_group_records_joined_group() {
        let (store, group, founder) = seeded().await;
        let user = store.user(founder.user_id).unwrap();
        assert_eq!(user.joined_groups, vec![group.id]);

        let snapshot = store.load_group_snapshot(group.id).await.unwrap();
        assert_eq!(snapshot.created_by.member_id, founder.id);
    }

    #[tokio::test]
    async fn stale_plan_is_rejected_without_writing() {
        let (store, group, _) = seeded().await;
        let newcomer = Uuid::new_v4();

        let mut first = WritePlan::new(group.id, 0);
        first.push(Write::UpdateGroup(GroupPatch::default()));
        store.apply(&first).await.unwrap();

        let mut stale = WritePlan::new(group.id, 0);
        stale.push(Write::UpdateGroup(GroupPatch {
            add_members: vec![newcomer],
            ..Default::default()
        }));
        let err = store.apply(&stale).await.unwrap_err();

        assert!(matches!(err, StoreError::StaleVersion));
        let group = store.group(group.id).unwrap();
        assert_eq!(group.version, 1);
        assert!(!group.members.contains(&newcomer));
    }

    #[tokio::test]
    async fn dissolve_plan_removes_group_and_late_messages() {
        let (store, group, founder) = seeded().await;
        let late = Message {
            id: Uuid::new_v4(),
            group_id: group.id,
            sender_id: founder.user_id,
            body: "posted after the plan was built".to_string(),
            media_file_id: None,
            created_at: Utc::now(),
        };
        store.insert_message(&late, None).await.unwrap();

        let mut plan = WritePlan::new(group.id, 0);
        plan.push(Write::DeleteMember(founder.id))
            .push(Write::UpdateUser {
                user_id: founder.user_id,
                patch: UserPatch::LeaveGroup(group.id),
            })
            .push(Write::DeleteGroup);
        store.apply(&plan).await.unwrap();

        assert!(store.group(group.id).is_none());
        assert!(store.member(founder.id).is_none());
        assert!(!store.has_message(late.id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn snapshots_never_see_half_applied_plans() {
        let (store, group, founder) = seeded().await;
        let group_id = group.id;
        let guest = UserRecord::new("guest");
        store.insert_user(guest.clone());

        let reader = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..2_000 {
                    let snapshot = store.load_group_snapshot(group_id).await?;
                    assert!(snapshot.members.len() <= 2);
                    tokio::task::yield_now().await;
                }
                Ok::<_, StoreError>(())
            })
        };

        // The removal deletes the record before dropping the group's
        // reference to it, so a reader slipping in between would see a
        // dangling member.
        for _ in 0..500 {
            let version = store.group(group_id).unwrap().version;
            let member = GroupMember::new(group_id, guest.id);
            let member_id = member.id;
            let mut join = WritePlan::new(group_id, version);
            join.push(Write::CreateMember(member))
                .push(Write::UpdateGroup(GroupPatch {
                    add_members: vec![member_id],
                    ..Default::default()
                }));
            store.apply(&join).await.unwrap();

            let mut leave = WritePlan::new(group_id, version + 1);
            leave
                .push(Write::DeleteMember(member_id))
                .push(Write::UpdateGroup(GroupPatch {
                    remove_members: vec![member_id],
                    ..Default::default()
                }));
            store.apply(&leave).await.unwrap();
            tokio::task::yield_now().await;
        }

        reader.await.unwrap().unwrap();
        let snapshot = store.load_group_snapshot(group_id).await.unwrap();
        assert_eq!(snapshot.members, vec![founder.member_ref()]);
    }

    #[tokio::test]
    async fn dangling_member_reference_is_malformed() {
        let (store, group, founder) = seeded().await;
        store.members.remove(&founder.id);

        let err = store.load_group_snapshot(group.id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Malformed(SnapshotError::MissingMember { .. })
        ));
    }

    #[tokio::test]
    async fn missing_group_lists_no_messages() {
        let store = MemoryStore::new();
        let messages = store.list_messages_for_group(Uuid::new_v4()).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn friend_requests_are_unique_per_pair() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = store.insert_friend_request(a, b).await.unwrap();
        assert_eq!(first.id, 1);

        let err = store.insert_friend_request(b, a).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }
}
