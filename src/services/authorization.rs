use crate::error::AppResult;
use crate::models::FriendshipStatus;
use crate::repository::RelationshipRepository;
use crate::services::retry_once;
use std::sync::Arc;
use uuid::Uuid;

/// The single choke-point deciding whether two users may exchange messages.
/// Every conversation view and send goes through here; the message store
/// additionally re-validates at write time.
pub struct AuthorizationGate {
    repo: Arc<dyn RelationshipRepository>,
}

impl AuthorizationGate {
    pub fn new(repo: Arc<dyn RelationshipRepository>) -> Self {
        Self { repo }
    }

    /// True iff the pair holds an accepted friendship and no block exists in
    /// either direction. The no-block condition is already implied by the
    /// relationship precedence rules, but it is the gate's own invariant and
    /// asserted here independently.
    pub async fn can_exchange(&self, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
        if user_a == user_b {
            return Ok(false);
        }
        let (blocked, _, _) = retry_once(|| self.repo.has_block_between(user_a, user_b)).await?;
        if blocked {
            return Ok(false);
        }
        let friendship = retry_once(|| self.repo.find_between(user_a, user_b)).await?;
        Ok(matches!(
            friendship,
            Some(f) if f.status == FriendshipStatus::Accepted
        ))
    }
}
