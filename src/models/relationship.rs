use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FriendshipStatus::Pending),
            "accepted" => Some(FriendshipStatus::Accepted),
            "rejected" => Some(FriendshipStatus::Rejected),
            _ => None,
        }
    }
}

/// A friendship row. At most one exists per unordered user pair; a rejected
/// row is recycled in place when either side asks again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Accepted friendship projected onto one side.
#[derive(Debug, Clone, Serialize)]
pub struct FriendEntry {
    pub user_id: Uuid,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RespondDecision {
    Accept,
    Reject,
}

/// Caller-visible result of asking for a friendship. The informational
/// variants are statuses, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FriendshipOutcome {
    /// A pending row now exists with the caller as requester (freshly
    /// inserted or recycled from a rejected row).
    Requested(Friendship),
    AlreadyFriends,
    AlreadyPending { requested_by: Uuid },
}

/// Classification of viewer's relationship to another user. Precedence when
/// deriving: Blocked beats everything, then Friend, then pending direction.
/// A block must hide an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    None,
    Friend,
    RequestSent,
    RequestReceived,
    Blocked,
}
