use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Group document as persisted. `created_by`, `members` and `admin` hold
/// GroupMember record ids, never user ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub members: Vec<Uuid>,
    pub admin: Vec<Uuid>,
    pub messages: Vec<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Group {
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

/// The scalar part of a group row, without its member collections.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GroupHeader {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl GroupMember {
    pub fn new(group_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            user_id,
            created_at: Utc::now(),
        }
    }

    pub fn member_ref(&self) -> MemberRef {
        MemberRef {
            member_id: self.id,
            user_id: self.user_id,
            joined_at: self.created_at,
        }
    }
}

/// A GroupMember record expanded to the fields role and succession logic need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub member_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("group {0} has no members")]
    NoMembers(Uuid),
    #[error("member record {member_id} referenced by group {group_id} is missing")]
    MissingMember { group_id: Uuid, member_id: Uuid },
    #[error("creator {member_id} of group {group_id} is not a member")]
    CreatorNotMember { group_id: Uuid, member_id: Uuid },
    #[error("admin {member_id} of group {group_id} is not a member")]
    AdminNotMember { group_id: Uuid, member_id: Uuid },
}

/// Consistent, fully expanded view of one group. Stores build it through
/// [`GroupSnapshot::assemble`], which rejects documents that break the
/// membership invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSnapshot {
    pub group_id: Uuid,
    pub name: String,
    pub description: String,
    pub version: i64,
    pub members: Vec<MemberRef>,
    pub admin: Vec<MemberRef>,
    pub created_by: MemberRef,
}

impl GroupSnapshot {
    /// Builds a snapshot from the group header, its member records (in the
    /// group's `members` order) and the ids of the admin records.
    pub fn assemble(
        header: GroupHeader,
        members: Vec<GroupMember>,
        admin_ids: &[Uuid],
    ) -> Result<Self, SnapshotError> {
        if members.is_empty() {
            return Err(SnapshotError::NoMembers(header.id));
        }

        let members: Vec<MemberRef> = members.iter().map(GroupMember::member_ref).collect();
        let find = |member_id: Uuid| members.iter().find(|m| m.member_id == member_id).copied();

        let created_by = find(header.created_by).ok_or(SnapshotError::CreatorNotMember {
            group_id: header.id,
            member_id: header.created_by,
        })?;

        let admin = admin_ids
            .iter()
            .map(|&member_id| {
                find(member_id).ok_or(SnapshotError::AdminNotMember {
                    group_id: header.id,
                    member_id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            group_id: header.id,
            name: header.name,
            description: header.description,
            version: header.version,
            members,
            admin,
            created_by,
        })
    }

    pub fn member_for_user(&self, user_id: Uuid) -> Option<&MemberRef> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    pub fn is_admin(&self, member_id: Uuid) -> bool {
        self.admin.iter().any(|m| m.member_id == member_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub media_file_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Metadata of an uploaded attachment. The bytes live with the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaFile {
    pub id: Uuid,
    pub group_id: Uuid,
    pub url: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct MessageRef {
    pub message_id: Uuid,
    pub media_file_id: Option<Uuid>,
}
