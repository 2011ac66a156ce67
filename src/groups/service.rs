use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::plan::{GroupPatch, UserPatch, Write, WritePlan};
use super::roles::{self, Action, Role};
use super::succession::{self, LeaveOutcome, Succession};
use crate::error::{ServiceError, ServiceResult};
use crate::models::groups::{Group, GroupMember, GroupSnapshot, MediaFile, MemberRef, Message};
use crate::models::users::InvitePolicy;
use crate::store::{MembershipStore, MessageStore, StoreError, UserDirectory};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub group: GroupSnapshot,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub content_type: String,
}

/// Entry point for every group lifecycle mutation. Each operation reads one
/// snapshot, validates against it, and hands a single [`WritePlan`] to the
/// membership store; rejected operations never write.
#[derive(Clone)]
pub struct GroupService {
    memberships: Arc<dyn MembershipStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
}

impl GroupService {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            memberships,
            messages,
            users,
        }
    }

    async fn load(&self, group_id: Uuid) -> ServiceResult<GroupSnapshot> {
        match self.memberships.load_group_snapshot(group_id).await {
            Ok(snapshot) => Ok(snapshot),
            Err(StoreError::NotFound) => Err(ServiceError::not_found("Group not found")),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(&self, plan: WritePlan) -> ServiceResult<()> {
        debug!(
            group_id = %plan.group_id,
            version = plan.expected_version,
            writes = ?plan.writes,
            "applying plan"
        );
        match self.memberships.apply(&plan).await {
            Err(StoreError::NotFound) => Err(ServiceError::not_found("Group not found")),
            other => Ok(other?),
        }
    }

    fn authorize(actor: Role, action: Action) -> ServiceResult<()> {
        if roles::permits(actor, action) {
            Ok(())
        } else {
            Err(ServiceError::permission(roles::denial_reason(actor, action)))
        }
    }

    pub async fn create_group(
        &self,
        actor_id: Uuid,
        name: &str,
        description: &str,
    ) -> ServiceResult<GroupSnapshot> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::validation(format!(
                "Group name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ServiceError::validation(format!(
                "Group description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if self.users.find_user_by_id(actor_id).await?.is_none() {
            return Err(ServiceError::not_found("User not found"));
        }

        let group_id = Uuid::new_v4();
        let founder = GroupMember::new(group_id, actor_id);
        let group = Group {
            id: group_id,
            name: name.to_string(),
            description: description.to_string(),
            created_by: founder.id,
            members: vec![founder.id],
            admin: vec![founder.id],
            messages: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        };

        self.memberships.insert_group(&group, &founder).await?;
        info!(%group_id, creator = %actor_id, "group created");

        let snapshot = GroupSnapshot::assemble(group.header(), vec![founder], &group.admin)
            .map_err(|e| ServiceError::Internal(e.into()))?;
        Ok(snapshot)
    }

    pub async fn get_group(&self, group_id: Uuid, actor_id: Uuid) -> ServiceResult<GroupView> {
        let snapshot = self.load(group_id).await?;
        let role = roles::resolve_role(&snapshot, actor_id);
        Self::authorize(role, Action::View)?;
        Ok(GroupView {
            group: snapshot,
            role,
        })
    }

    pub async fn leave_group(&self, group_id: Uuid, actor_id: Uuid) -> ServiceResult<LeaveOutcome> {
        let snapshot = self.load(group_id).await?;
        let role = roles::resolve_role(&snapshot, actor_id);
        Self::authorize(role, Action::Leave)?;
        let leaving = *snapshot
            .member_for_user(actor_id)
            .ok_or_else(|| ServiceError::permission("You are not a member of this group"))?;

        let succession = succession::decide(&snapshot, &leaving, role);
        let messages = match succession {
            Succession::Dissolve => self.messages.list_messages_for_group(group_id).await?,
            _ => Vec::new(),
        };

        let mut plan = WritePlan::new(group_id, snapshot.version);
        succession::plan_departure(&mut plan, &snapshot, &leaving, succession, &messages);
        self.commit(plan).await?;

        let outcome = succession.outcome();
        match outcome {
            LeaveOutcome::Left => info!(%group_id, user = %actor_id, "member left group"),
            LeaveOutcome::HandedOver { new_creator_user_id } => info!(
                %group_id,
                user = %actor_id,
                new_creator = %new_creator_user_id,
                "creator left group, ownership handed over"
            ),
            LeaveOutcome::Dissolved => info!(
                %group_id,
                user = %actor_id,
                messages = messages.len(),
                "last member left, group deleted"
            ),
        }
        Ok(outcome)
    }

    pub async fn add_member(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        target_username: &str,
    ) -> ServiceResult<MemberRef> {
        let snapshot = self.load(group_id).await?;

        let target = self
            .users
            .find_user_by_username(target_username.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        if target.id == actor_id {
            return Err(ServiceError::validation("You cannot add yourself to a group"));
        }

        Self::authorize(roles::resolve_role(&snapshot, actor_id), Action::AddMember)?;

        let policy = self.users.get_accept_group_invites_from(target.id).await?;
        if policy == InvitePolicy::Friends && !target.is_friend(actor_id) {
            return Err(ServiceError::permission(format!(
                "{} only accepts group invites from friends",
                target.username
            )));
        }

        if snapshot.member_for_user(target.id).is_some() {
            return Err(ServiceError::conflict(format!(
                "{} is already a member of this group",
                target.username
            )));
        }

        let member = GroupMember::new(group_id, target.id);
        let added = member.member_ref();
        let mut plan = WritePlan::new(group_id, snapshot.version);
        // The record must exist before the group references it.
        plan.push(Write::CreateMember(member))
            .push(Write::UpdateGroup(GroupPatch {
                add_members: vec![added.member_id],
                ..Default::default()
            }))
            .push(Write::UpdateUser {
                user_id: target.id,
                patch: UserPatch::JoinGroup(group_id),
            });
        self.commit(plan).await?;

        info!(%group_id, actor = %actor_id, user = %target.id, "member added");
        Ok(added)
    }

    pub async fn remove_member(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        target_user_id: Uuid,
    ) -> ServiceResult<()> {
        if target_user_id == actor_id {
            return Err(ServiceError::validation(
                "You cannot remove yourself, leave the group instead",
            ));
        }

        let snapshot = self.load(group_id).await?;
        // Callers without removal rights learn nothing about who is a member.
        Self::authorize(roles::resolve_role(&snapshot, actor_id), Action::RemoveMember)?;

        let target = *snapshot
            .member_for_user(target_user_id)
            .ok_or_else(|| ServiceError::validation("User is not a member of this group"))?;
        let target_role = roles::resolve_role(&snapshot, target_user_id);
        if roles::is_protected_target(Action::RemoveMember, target_role) {
            return Err(ServiceError::permission("The group creator cannot be removed"));
        }

        let mut plan = WritePlan::new(group_id, snapshot.version);
        plan.push(Write::UpdateGroup(GroupPatch {
            remove_admins: if snapshot.is_admin(target.member_id) {
                vec![target.member_id]
            } else {
                Vec::new()
            },
            remove_members: vec![target.member_id],
            ..Default::default()
        }))
        .push(Write::UpdateUser {
            user_id: target_user_id,
            patch: UserPatch::LeaveGroup(group_id),
        })
        .push(Write::DeleteMember(target.member_id));
        self.commit(plan).await?;

        info!(%group_id, actor = %actor_id, user = %target_user_id, "member removed");
        Ok(())
    }

    pub async fn promote_to_admin(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        target_user_id: Uuid,
    ) -> ServiceResult<()> {
        if target_user_id == actor_id {
            return Err(ServiceError::validation("You cannot promote yourself"));
        }

        let snapshot = self.load(group_id).await?;
        Self::authorize(roles::resolve_role(&snapshot, actor_id), Action::PromoteAdmin)?;

        let target = *snapshot
            .member_for_user(target_user_id)
            .ok_or_else(|| ServiceError::validation("User is not a member of this group"))?;
        if snapshot.is_admin(target.member_id) {
            return Err(ServiceError::conflict("User is already an admin"));
        }

        let mut plan = WritePlan::new(group_id, snapshot.version);
        plan.push(Write::UpdateGroup(GroupPatch {
            add_admins: vec![target.member_id],
            ..Default::default()
        }));
        self.commit(plan).await?;

        info!(%group_id, actor = %actor_id, user = %target_user_id, "member promoted to admin");
        Ok(())
    }

    pub async fn demote_from_admin(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        target_user_id: Uuid,
    ) -> ServiceResult<()> {
        if target_user_id == actor_id {
            return Err(ServiceError::validation("You cannot demote yourself"));
        }

        let snapshot = self.load(group_id).await?;
        Self::authorize(roles::resolve_role(&snapshot, actor_id), Action::DemoteAdmin)?;

        let target_role = roles::resolve_role(&snapshot, target_user_id);
        if roles::is_protected_target(Action::DemoteAdmin, target_role) {
            return Err(ServiceError::permission("The group creator cannot be demoted"));
        }
        let target = snapshot
            .member_for_user(target_user_id)
            .filter(|m| snapshot.is_admin(m.member_id))
            .copied()
            .ok_or_else(|| ServiceError::validation("User is not an admin of this group"))?;

        let mut plan = WritePlan::new(group_id, snapshot.version);
        plan.push(Write::UpdateGroup(GroupPatch {
            remove_admins: vec![target.member_id],
            ..Default::default()
        }));
        self.commit(plan).await?;

        info!(%group_id, actor = %actor_id, user = %target_user_id, "admin demoted");
        Ok(())
    }

    pub async fn post_message(
        &self,
        group_id: Uuid,
        actor_id: Uuid,
        body: &str,
        attachment: Option<Attachment>,
    ) -> ServiceResult<Message> {
        let body = body.trim();
        if body.chars().count() > MAX_MESSAGE_LEN {
            return Err(ServiceError::validation(format!(
                "Messages must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }
        if body.is_empty() && attachment.is_none() {
            return Err(ServiceError::validation("Message cannot be empty"));
        }

        let snapshot = self.load(group_id).await?;
        Self::authorize(roles::resolve_role(&snapshot, actor_id), Action::PostMessage)?;

        let now = Utc::now();
        let media = attachment.map(|a| MediaFile {
            id: Uuid::new_v4(),
            group_id,
            url: a.url,
            content_type: a.content_type,
            created_at: now,
        });
        let message = Message {
            id: Uuid::new_v4(),
            group_id,
            sender_id: actor_id,
            body: body.to_string(),
            media_file_id: media.as_ref().map(|m| m.id),
            created_at: now,
        };

        match self.messages.insert_message(&message, media.as_ref()).await {
            Err(StoreError::NotFound) => return Err(ServiceError::not_found("Group not found")),
            other => other?,
        }
        debug!(%group_id, message_id = %message.id, "message posted");
        Ok(message)
    }
}
