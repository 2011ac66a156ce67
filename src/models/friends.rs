use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// Row of `friend_requests`, see migrations/0001_init.sql.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FriendRequest {
    pub id: i32,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub created_at: DateTime<Utc>,
}
