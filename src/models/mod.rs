pub mod message;
pub mod relationship;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use message::{AttachmentRef, DeliveryStatus, Message};
pub use relationship::{
    Block, FriendEntry, Friendship, FriendshipOutcome, FriendshipStatus, RelationshipKind,
    RespondDecision,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}
