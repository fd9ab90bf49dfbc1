use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{
    Block, FriendEntry, Friendship, FriendshipOutcome, FriendshipStatus, RelationshipKind,
    RespondDecision,
};
use crate::repository::{PairUpsert, RelationshipRepository};
use crate::services::retry_once;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Owns friendship and block facts. The single-row-per-pair invariant lives
/// in the repository's pair-keyed upsert; this layer classifies outcomes and
/// enforces the caller-facing rules.
pub struct RelationshipService {
    repo: Arc<dyn RelationshipRepository>,
}

impl RelationshipService {
    pub fn new(repo: Arc<dyn RelationshipRepository>) -> Self {
        Self { repo }
    }

    pub async fn request_friendship(&self, from: Uuid, to: Uuid) -> AppResult<FriendshipOutcome> {
        if from == to {
            return Err(AppError::SelfTarget);
        }
        let (blocked, _, _) = retry_once(|| self.repo.has_block_between(from, to)).await?;
        if blocked {
            return Err(AppError::Forbidden);
        }

        let outcome = match retry_once(|| self.repo.upsert_pending(from, to)).await? {
            PairUpsert::Inserted(f) => {
                metrics::friend_request_outcome("created");
                debug!(%from, %to, "friend request created");
                FriendshipOutcome::Requested(f)
            }
            PairUpsert::Recycled(f) => {
                metrics::friend_request_outcome("recycled");
                debug!(%from, %to, "rejected friendship recycled to pending");
                FriendshipOutcome::Requested(f)
            }
            PairUpsert::Existing(f) => match f.status {
                FriendshipStatus::Accepted => {
                    metrics::friend_request_outcome("already_friends");
                    FriendshipOutcome::AlreadyFriends
                }
                FriendshipStatus::Pending => {
                    metrics::friend_request_outcome("already_pending");
                    FriendshipOutcome::AlreadyPending {
                        requested_by: f.from_user,
                    }
                }
                // A reject landed between the upsert and our classification
                // read; the caller lost that race and may retry.
                FriendshipStatus::Rejected => return Err(AppError::Conflict),
            },
        };
        Ok(outcome)
    }

    pub async fn respond(
        &self,
        request_id: Uuid,
        responder: Uuid,
        decision: RespondDecision,
    ) -> AppResult<()> {
        let updated = retry_once(|| self.repo.respond(request_id, responder, decision)).await?;
        if !updated {
            return Err(AppError::NotFound);
        }
        debug!(%request_id, %responder, ?decision, "friend request resolved");
        Ok(())
    }

    pub async fn cancel(&self, requester: Uuid, target: Uuid) -> AppResult<()> {
        let deleted = retry_once(|| self.repo.cancel_pending(requester, target)).await?;
        if !deleted {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Deleting a friendship that is already gone is a no-op, not an error.
    pub async fn unfriend(&self, user_a: Uuid, user_b: Uuid) -> AppResult<()> {
        retry_once(|| self.repo.delete_accepted(user_a, user_b)).await?;
        Ok(())
    }

    /// Idempotent: blocking an already-blocked user succeeds quietly. Any
    /// friendship between the pair dies with the block, atomically.
    pub async fn block(&self, blocker: Uuid, target: Uuid) -> AppResult<()> {
        if blocker == target {
            return Err(AppError::SelfTarget);
        }
        retry_once(|| self.repo.create_block(blocker, target)).await?;
        Ok(())
    }

    pub async fn unblock(&self, blocker: Uuid, target: Uuid) -> AppResult<()> {
        retry_once(|| self.repo.delete_block(blocker, target)).await?;
        Ok(())
    }

    /// Single derived classification. Precedence is load-bearing: a block
    /// must hide an outstanding request from the viewer's perspective.
    pub async fn relationship_status(
        &self,
        viewer: Uuid,
        other: Uuid,
    ) -> AppResult<RelationshipKind> {
        if viewer == other {
            return Ok(RelationshipKind::None);
        }
        let (blocked, _, _) = retry_once(|| self.repo.has_block_between(viewer, other)).await?;
        if blocked {
            return Ok(RelationshipKind::Blocked);
        }
        let kind = match retry_once(|| self.repo.find_between(viewer, other)).await? {
            Some(f) if f.status == FriendshipStatus::Accepted => RelationshipKind::Friend,
            Some(f) if f.status == FriendshipStatus::Pending => {
                if f.from_user == viewer {
                    RelationshipKind::RequestSent
                } else {
                    RelationshipKind::RequestReceived
                }
            }
            _ => RelationshipKind::None,
        };
        Ok(kind)
    }

    pub async fn list_friends(&self, user: Uuid) -> AppResult<Vec<FriendEntry>> {
        retry_once(|| self.repo.list_friends(user)).await
    }

    pub async fn list_pending_received(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        retry_once(|| self.repo.list_pending_received(user)).await
    }

    pub async fn list_pending_sent(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        retry_once(|| self.repo.list_pending_sent(user)).await
    }

    pub async fn list_blocked(&self, user: Uuid) -> AppResult<Vec<Block>> {
        retry_once(|| self.repo.list_blocked(user)).await
    }
}
