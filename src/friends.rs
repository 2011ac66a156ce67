use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::friends::FriendRequest;
use crate::store::{FriendStore, StoreError, UserDirectory};

/// Friend requests and the symmetric friendship edges they turn into.
#[derive(Clone)]
pub struct FriendService {
    requests: Arc<dyn FriendStore>,
    users: Arc<dyn UserDirectory>,
}

impl FriendService {
    pub fn new(requests: Arc<dyn FriendStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { requests, users }
    }

    pub async fn send_friend_request(
        &self,
        actor_id: Uuid,
        receiver_id: Uuid,
    ) -> ServiceResult<FriendRequest> {
        if actor_id == receiver_id {
            return Err(ServiceError::validation(
                "You cannot send a friend request to yourself",
            ));
        }

        let receiver = self
            .users
            .find_user_by_id(receiver_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        if receiver.is_friend(actor_id) {
            return Err(ServiceError::conflict("You are already friends"));
        }

        let request = match self.requests.insert_friend_request(actor_id, receiver_id).await {
            Err(StoreError::Duplicate) => {
                return Err(ServiceError::conflict(
                    "A friend request between you already exists",
                ))
            }
            other => other?,
        };

        info!(
            request_id = request.id,
            sender = %actor_id,
            receiver = %receiver_id,
            "friend request sent"
        );
        Ok(request)
    }

    /// Loads the request and checks that `actor_id` is the one it was sent to.
    async fn received_request(
        &self,
        actor_id: Uuid,
        request_id: i32,
    ) -> ServiceResult<FriendRequest> {
        let request = self
            .requests
            .get_friend_request(request_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Friend request not found"))?;

        if request.receiver_id != actor_id {
            return Err(ServiceError::permission(
                "You are not authorized to respond to this friend request",
            ));
        }
        Ok(request)
    }

    pub async fn accept_friend_request(&self, actor_id: Uuid, request_id: i32) -> ServiceResult<()> {
        let request = self.received_request(actor_id, request_id).await?;

        match self.requests.accept_friend_request(&request).await {
            Err(StoreError::NotFound) => {
                return Err(ServiceError::not_found("Friend request not found"))
            }
            Err(StoreError::Duplicate) => {
                return Err(ServiceError::conflict("You are already friends"))
            }
            other => other?,
        }

        info!(
            request_id,
            sender = %request.sender_id,
            receiver = %actor_id,
            "friend request accepted"
        );
        Ok(())
    }

    pub async fn decline_friend_request(&self, actor_id: Uuid, request_id: i32) -> ServiceResult<()> {
        self.received_request(actor_id, request_id).await?;

        match self.requests.delete_friend_request(request_id).await {
            Err(StoreError::NotFound) => {
                return Err(ServiceError::not_found("Friend request not found"))
            }
            other => other?,
        }

        info!(request_id, receiver = %actor_id, "friend request declined");
        Ok(())
    }
}
