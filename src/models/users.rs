use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who may add a user to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invite_policy", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitePolicy {
    Friends,
    #[default]
    Anyone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub accept_group_invites_from: InvitePolicy,
    pub friends: Vec<Uuid>,
    pub joined_groups: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            accept_group_invites_from: InvitePolicy::default(),
            friends: Vec::new(),
            joined_groups: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_friend(&self, other: Uuid) -> bool {
        self.friends.contains(&other)
    }
}
