use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::models::groups::GroupSnapshot;

/// A user's standing in one group, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    NotInGroup,
    Member,
    Admin,
    Creator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::NotInGroup => "non-members",
            Role::Member => "members",
            Role::Admin => "admins",
            Role::Creator => "the group creator",
        };
        f.write_str(s)
    }
}

pub fn resolve_role(snapshot: &GroupSnapshot, user_id: Uuid) -> Role {
    let Some(member) = snapshot.member_for_user(user_id) else {
        return Role::NotInGroup;
    };

    if snapshot.created_by.member_id == member.member_id {
        Role::Creator
    } else if snapshot.is_admin(member.member_id) {
        Role::Admin
    } else {
        Role::Member
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Leave,
    PostMessage,
    AddMember,
    RemoveMember,
    PromoteAdmin,
    DemoteAdmin,
}

impl Action {
    fn describe(self) -> &'static str {
        match self {
            Action::View => "view this group",
            Action::Leave => "leave this group",
            Action::PostMessage => "post in this group",
            Action::AddMember => "add members",
            Action::RemoveMember => "remove members",
            Action::PromoteAdmin => "promote admins",
            Action::DemoteAdmin => "demote admins",
        }
    }
}

struct Capability {
    action: Action,
    /// Lowest actor role allowed to perform the action.
    min_role: Role,
    /// Roles the action may never be applied to.
    protected_targets: &'static [Role],
}

// Promotion is open to every admin while demotion is reserved for the
// creator, and nobody can remove or demote the creator.
const CAPABILITIES: &[Capability] = &[
    Capability {
        action: Action::View,
        min_role: Role::Member,
        protected_targets: &[],
    },
    Capability {
        action: Action::Leave,
        min_role: Role::Member,
        protected_targets: &[],
    },
    Capability {
        action: Action::PostMessage,
        min_role: Role::Member,
        protected_targets: &[],
    },
    Capability {
        action: Action::AddMember,
        min_role: Role::Admin,
        protected_targets: &[],
    },
    Capability {
        action: Action::RemoveMember,
        min_role: Role::Admin,
        protected_targets: &[Role::Creator],
    },
    Capability {
        action: Action::PromoteAdmin,
        min_role: Role::Admin,
        protected_targets: &[],
    },
    Capability {
        action: Action::DemoteAdmin,
        min_role: Role::Creator,
        protected_targets: &[Role::Creator],
    },
];

fn capability(action: Action) -> &'static Capability {
    CAPABILITIES
        .iter()
        .find(|c| c.action == action)
        .unwrap_or_else(|| unreachable!("every action has a capability entry"))
}

pub fn required_role(action: Action) -> Role {
    capability(action).min_role
}

pub fn permits(actor: Role, action: Action) -> bool {
    actor != Role::NotInGroup && actor >= required_role(action)
}

pub fn is_protected_target(action: Action, target: Role) -> bool {
    capability(action).protected_targets.contains(&target)
}

/// Human-readable reason an actor with `actor` role may not perform `action`.
pub fn denial_reason(actor: Role, action: Action) -> String {
    if actor == Role::NotInGroup {
        return "You are not a member of this group".to_string();
    }
    format!("Only {} can {}", required_role(action), action.describe())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::groups::MemberRef;

    fn member(offset: i64) -> MemberRef {
        MemberRef {
            member_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            joined_at: Utc::now() + Duration::seconds(offset),
        }
    }

    #[test]
    fn resolves_each_role() {
        let creator = member(0);
        let admin = member(1);
        let plain = member(2);
        let snapshot = GroupSnapshot {
            group_id: Uuid::new_v4(),
            name: "g".to_string(),
            description: String::new(),
            version: 0,
            members: vec![creator, admin, plain],
            admin: vec![creator, admin],
            created_by: creator,
        };

        assert_eq!(resolve_role(&snapshot, creator.user_id), Role::Creator);
        assert_eq!(resolve_role(&snapshot, admin.user_id), Role::Admin);
        assert_eq!(resolve_role(&snapshot, plain.user_id), Role::Member);
        assert_eq!(resolve_role(&snapshot, Uuid::new_v4()), Role::NotInGroup);
    }

    #[test]
    fn creator_outside_admin_set_is_still_creator() {
        let creator = member(0);
        let snapshot = GroupSnapshot {
            group_id: Uuid::new_v4(),
            name: "g".to_string(),
            description: String::new(),
            version: 0,
            members: vec![creator],
            admin: vec![],
            created_by: creator,
        };
        assert_eq!(resolve_role(&snapshot, creator.user_id), Role::Creator);
    }

    #[test]
    fn promotion_and_demotion_are_asymmetric() {
        assert!(permits(Role::Admin, Action::PromoteAdmin));
        assert!(!permits(Role::Admin, Action::DemoteAdmin));
        assert!(permits(Role::Creator, Action::DemoteAdmin));
        assert!(!permits(Role::Member, Action::PromoteAdmin));
    }

    #[test]
    fn non_members_can_do_nothing() {
        for action in [
            Action::View,
            Action::Leave,
            Action::PostMessage,
            Action::AddMember,
            Action::RemoveMember,
            Action::PromoteAdmin,
            Action::DemoteAdmin,
        ] {
            assert!(!permits(Role::NotInGroup, action), "{action:?}");
        }
    }

    #[test]
    fn creator_is_protected_from_removal() {
        assert!(is_protected_target(Action::RemoveMember, Role::Creator));
        assert!(!is_protected_target(Action::RemoveMember, Role::Admin));
        assert!(is_protected_target(Action::DemoteAdmin, Role::Creator));
    }

    #[test]
    fn denial_reason_names_required_role() {
        assert_eq!(
            denial_reason(Role::Admin, Action::DemoteAdmin),
            "Only the group creator can demote admins"
        );
        assert_eq!(
            denial_reason(Role::NotInGroup, Action::Leave),
            "You are not a member of this group"
        );
    }
}
