use crate::error::AppResult;
use crate::models::{
    AttachmentRef, Block, DeliveryStatus, FriendEntry, Friendship, Message, RespondDecision, User,
};
use uuid::Uuid;

/// Result of the pair-keyed friendship upsert. `Existing` carries the live
/// row the caller lost the race to (or that predates the call); the service
/// layer classifies it, never issues a second insert.
#[derive(Debug, Clone)]
pub enum PairUpsert {
    Inserted(Friendship),
    Recycled(Friendship),
    Existing(Friendship),
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: Option<String>,
    pub attachment: Option<AttachmentRef>,
}

/// Storage seam for friendship and block facts. Both backends must provide
/// the same atomicity guarantees: the upsert is serialized per unordered
/// pair, mutations are guarded by current row state, and `create_block`
/// removes any friendship in the same atomic step.
#[async_trait::async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Atomically ensure a pending row for the unordered pair, recycling a
    /// rejected row in place. Never produces a second row for the pair.
    async fn upsert_pending(&self, from: Uuid, to: Uuid) -> AppResult<PairUpsert>;

    /// Resolve a pending request. Returns false when no pending row with
    /// this id is addressed to `responder`.
    async fn respond(
        &self,
        request_id: Uuid,
        responder: Uuid,
        decision: RespondDecision,
    ) -> AppResult<bool>;

    /// Delete the requester's own pending row toward `target`.
    async fn cancel_pending(&self, requester: Uuid, target: Uuid) -> AppResult<bool>;

    /// Delete the accepted row between the pair, either orientation.
    async fn delete_accepted(&self, user_a: Uuid, user_b: Uuid) -> AppResult<bool>;

    async fn find_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Option<Friendship>>;

    async fn list_friends(&self, user: Uuid) -> AppResult<Vec<FriendEntry>>;
    async fn list_pending_received(&self, user: Uuid) -> AppResult<Vec<Friendship>>;
    async fn list_pending_sent(&self, user: Uuid) -> AppResult<Vec<Friendship>>;

    /// Insert the block (idempotent) and drop any friendship between the
    /// pair in the same transaction. Returns false when already blocked.
    async fn create_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool>;

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool>;

    /// (either_direction, a_blocked_b, b_blocked_a)
    async fn has_block_between(&self, user_a: Uuid, user_b: Uuid)
        -> AppResult<(bool, bool, bool)>;

    async fn list_blocked(&self, user: Uuid) -> AppResult<Vec<Block>>;
}

/// Storage seam for messages. Delivery advancement is expressed as guarded
/// conditional updates so racing viewers cannot double-stamp or skip a stamp.
#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a message, re-validating at write time that an accepted
    /// friendship exists and no block does. `None` means the gate failed at
    /// the point of persistence (e.g. a block landed after the pre-check).
    async fn insert_authorized(&self, msg: NewMessage) -> AppResult<Option<Message>>;

    /// All messages between the unordered pair, `created_at` ascending.
    async fn history_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>>;

    /// Sent -> Delivered for everything from `peer` addressed to `viewer`.
    async fn mark_delivered_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64>;

    /// -> Read for every unread row from `peer` addressed to `viewer`,
    /// stamping `delivered_at` too when the Delivered hop was collapsed.
    async fn mark_read_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64>;

    /// Advance a single message one step if `viewer` is its receiver.
    /// `None` when the message is absent or addressed to someone else.
    async fn advance_one(&self, message_id: Uuid, viewer: Uuid)
        -> AppResult<Option<DeliveryStatus>>;

    async fn unread_count(&self, user: Uuid) -> AppResult<i64>;

    /// Newest-first unread messages with sender usernames, capped at `limit`.
    async fn unread_recent(&self, user: Uuid, limit: i64) -> AppResult<Vec<(Message, String)>>;
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn upsert(&self, id: Uuid, username: &str) -> AppResult<User>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Resolve a username or a textual uuid to a user.
    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>>;

    /// Username substring search excluding the viewer and anyone sharing a
    /// block with the viewer, in either direction.
    async fn search(&self, viewer: Uuid, query: &str, limit: i64) -> AppResult<Vec<User>>;
}
