use serde::Serialize;
use uuid::Uuid;

use super::plan::{GroupPatch, UserPatch, Write, WritePlan};
use super::roles::Role;
use crate::models::groups::{GroupSnapshot, MemberRef, MessageRef};

/// What happens to the group when a member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Succession {
    /// A member or admin leaves; nobody inherits anything.
    Depart,
    /// The creator leaves and the earliest-joined other admin becomes creator.
    PromoteAdmin(MemberRef),
    /// The creator leaves without other admins; the earliest-joined member
    /// becomes admin and creator.
    PromoteMember(MemberRef),
    /// The creator was the last member; the group is deleted.
    Dissolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeaveOutcome {
    Left,
    HandedOver { new_creator_user_id: Uuid },
    Dissolved,
}

impl Succession {
    pub fn outcome(&self) -> LeaveOutcome {
        match self {
            Succession::Depart => LeaveOutcome::Left,
            Succession::PromoteAdmin(heir) | Succession::PromoteMember(heir) => {
                LeaveOutcome::HandedOver {
                    new_creator_user_id: heir.user_id,
                }
            }
            Succession::Dissolve => LeaveOutcome::Dissolved,
        }
    }
}

/// Earliest by join timestamp, ties broken by member record id.
fn earliest<'a>(candidates: impl Iterator<Item = &'a MemberRef>) -> Option<MemberRef> {
    candidates
        .min_by_key(|m| (m.joined_at, m.member_id))
        .copied()
}

fn others(set: &[MemberRef], leaving: Uuid) -> impl Iterator<Item = &MemberRef> {
    set.iter().filter(move |m| m.member_id != leaving)
}

/// Decides the succession for `leaving`, whose resolved role is `role`.
/// `role` must not be [`Role::NotInGroup`].
pub fn decide(snapshot: &GroupSnapshot, leaving: &MemberRef, role: Role) -> Succession {
    if role != Role::Creator {
        return Succession::Depart;
    }

    if let Some(heir) = earliest(others(&snapshot.admin, leaving.member_id)) {
        Succession::PromoteAdmin(heir)
    } else if let Some(heir) = earliest(others(&snapshot.members, leaving.member_id)) {
        Succession::PromoteMember(heir)
    } else {
        Succession::Dissolve
    }
}

/// Appends the writes that carry out `succession` to `plan`.
///
/// `messages` is only consulted when the group dissolves.
pub fn plan_departure(
    plan: &mut WritePlan,
    snapshot: &GroupSnapshot,
    leaving: &MemberRef,
    succession: Succession,
    messages: &[MessageRef],
) {
    let leave_user = Write::UpdateUser {
        user_id: leaving.user_id,
        patch: UserPatch::LeaveGroup(snapshot.group_id),
    };
    let was_admin = snapshot.is_admin(leaving.member_id);
    let mut patch = GroupPatch {
        remove_members: vec![leaving.member_id],
        remove_admins: if was_admin { vec![leaving.member_id] } else { Vec::new() },
        ..Default::default()
    };

    match succession {
        Succession::Depart => {}
        Succession::PromoteAdmin(heir) => {
            patch.created_by = Some(heir.member_id);
        }
        Succession::PromoteMember(heir) => {
            patch.created_by = Some(heir.member_id);
            patch.add_admins.push(heir.member_id);
        }
        Succession::Dissolve => {
            for message in messages {
                plan.push(Write::DeleteMessage(message.message_id));
                if let Some(media_id) = message.media_file_id {
                    plan.push(Write::DeleteMedia(media_id));
                }
            }
            plan.push(Write::DeleteMember(leaving.member_id))
                .push(leave_user)
                .push(Write::DeleteGroup);
            return;
        }
    }

    plan.push(Write::UpdateGroup(patch))
        .push(leave_user)
        .push(Write::DeleteMember(leaving.member_id));
}
