use std::sync::Arc;

use crate::friends::FriendService;
use crate::groups::GroupService;
use crate::store::{FriendStore, MembershipStore, MessageStore, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub groups: GroupService,
    pub friends: FriendService,
}

impl AppState {
    /// Wires both services to one backing store.
    pub fn from_store<S>(store: S) -> Self
    where
        S: MembershipStore + MessageStore + UserDirectory + FriendStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            groups: GroupService::new(store.clone(), store.clone(), store.clone()),
            friends: FriendService::new(store.clone(), store),
        }
    }
}
