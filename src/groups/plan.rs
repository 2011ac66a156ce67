use uuid::Uuid;

use crate::models::groups::{Group, GroupMember};

/// Changes to a group's reference sets. Applied in field order:
/// `created_by`, `add_members`, `add_admins`, `remove_admins`, `remove_members`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub created_by: Option<Uuid>,
    pub add_members: Vec<Uuid>,
    pub add_admins: Vec<Uuid>,
    pub remove_admins: Vec<Uuid>,
    pub remove_members: Vec<Uuid>,
}

impl GroupPatch {
    pub fn apply_to(&self, group: &mut Group) {
        if let Some(created_by) = self.created_by {
            group.created_by = created_by;
        }
        for id in &self.add_members {
            if !group.members.contains(id) {
                group.members.push(*id);
            }
        }
        for id in &self.add_admins {
            if !group.admin.contains(id) {
                group.admin.push(*id);
            }
        }
        group.admin.retain(|id| !self.remove_admins.contains(id));
        group.members.retain(|id| !self.remove_members.contains(id));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserPatch {
    JoinGroup(Uuid),
    LeaveGroup(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    CreateMember(GroupMember),
    UpdateGroup(GroupPatch),
    UpdateUser { user_id: Uuid, patch: UserPatch },
    DeleteMember(Uuid),
    DeleteMessage(Uuid),
    DeleteMedia(Uuid),
    DeleteGroup,
}

/// Ordered writes for one group, computed from the snapshot at
/// `expected_version`. Stores execute them in sequence, so a crash between
/// two writes leaves the earlier ones in place: pointer updates always come
/// before the record deletions they make safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub group_id: Uuid,
    pub expected_version: i64,
    pub writes: Vec<Write>,
}

impl WritePlan {
    pub fn new(group_id: Uuid, expected_version: i64) -> Self {
        Self {
            group_id,
            expected_version,
            writes: Vec::new(),
        }
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }
}
