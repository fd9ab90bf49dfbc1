use crate::error::AppResult;
use crate::models::{
    Block, DeliveryStatus, FriendEntry, Friendship, FriendshipStatus, Message, RespondDecision,
    User,
};
use crate::repository::traits::{
    MessageRepository, NewMessage, PairUpsert, RelationshipRepository, UserRepository,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process store used by the test suite and local development. The whole
/// relationship state sits behind one mutex, so the pair upsert and the
/// block transaction are serialized exactly like their SQL counterparts.
///
/// Lock order is rel -> messages -> users everywhere; only the authorized
/// insert holds two locks at once.
#[derive(Default)]
pub struct MemoryStore {
    rel: Mutex<RelState>,
    messages: Mutex<Vec<Message>>,
    users: Mutex<HashMap<Uuid, User>>,
}

#[derive(Default)]
struct RelState {
    /// Keyed by the normalized unordered pair.
    friendships: HashMap<(Uuid, Uuid), Friendship>,
    /// Keyed by the ordered (blocker, blocked) pair.
    blocks: HashMap<(Uuid, Uuid), DateTime<Utc>>,
}

fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl RelState {
    fn has_block_between(&self, a: Uuid, b: Uuid) -> (bool, bool, bool) {
        let a_b = self.blocks.contains_key(&(a, b));
        let b_a = self.blocks.contains_key(&(b, a));
        (a_b || b_a, a_b, b_a)
    }

    fn can_exchange(&self, a: Uuid, b: Uuid) -> bool {
        if self.has_block_between(a, b).0 {
            return false;
        }
        matches!(
            self.friendships.get(&pair_key(a, b)),
            Some(f) if f.status == FriendshipStatus::Accepted
        )
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RelationshipRepository for MemoryStore {
    async fn upsert_pending(&self, from: Uuid, to: Uuid) -> AppResult<PairUpsert> {
        use std::collections::hash_map::Entry;

        let mut rel = self.rel.lock().await;
        let now = Utc::now();
        match rel.friendships.entry(pair_key(from, to)) {
            Entry::Vacant(slot) => {
                let friendship = Friendship {
                    id: Uuid::new_v4(),
                    from_user: from,
                    to_user: to,
                    status: FriendshipStatus::Pending,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(friendship.clone());
                Ok(PairUpsert::Inserted(friendship))
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if existing.status == FriendshipStatus::Rejected {
                    existing.from_user = from;
                    existing.to_user = to;
                    existing.status = FriendshipStatus::Pending;
                    existing.updated_at = now;
                    Ok(PairUpsert::Recycled(existing.clone()))
                } else {
                    Ok(PairUpsert::Existing(existing.clone()))
                }
            }
        }
    }

    async fn respond(
        &self,
        request_id: Uuid,
        responder: Uuid,
        decision: RespondDecision,
    ) -> AppResult<bool> {
        let mut rel = self.rel.lock().await;
        let row = rel.friendships.values_mut().find(|f| {
            f.id == request_id && f.to_user == responder && f.status == FriendshipStatus::Pending
        });
        match row {
            Some(f) => {
                f.status = match decision {
                    RespondDecision::Accept => FriendshipStatus::Accepted,
                    RespondDecision::Reject => FriendshipStatus::Rejected,
                };
                f.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel_pending(&self, requester: Uuid, target: Uuid) -> AppResult<bool> {
        let mut rel = self.rel.lock().await;
        let key = pair_key(requester, target);
        let matches = matches!(
            rel.friendships.get(&key),
            Some(f) if f.status == FriendshipStatus::Pending
                && f.from_user == requester
                && f.to_user == target
        );
        if matches {
            rel.friendships.remove(&key);
        }
        Ok(matches)
    }

    async fn delete_accepted(&self, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
        let mut rel = self.rel.lock().await;
        let key = pair_key(user_a, user_b);
        let matches = matches!(
            rel.friendships.get(&key),
            Some(f) if f.status == FriendshipStatus::Accepted
        );
        if matches {
            rel.friendships.remove(&key);
        }
        Ok(matches)
    }

    async fn find_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Option<Friendship>> {
        let rel = self.rel.lock().await;
        Ok(rel.friendships.get(&pair_key(user_a, user_b)).cloned())
    }

    async fn list_friends(&self, user: Uuid) -> AppResult<Vec<FriendEntry>> {
        let rel = self.rel.lock().await;
        let mut friends: Vec<FriendEntry> = rel
            .friendships
            .values()
            .filter(|f| {
                f.status == FriendshipStatus::Accepted
                    && (f.from_user == user || f.to_user == user)
            })
            .map(|f| FriendEntry {
                user_id: if f.from_user == user {
                    f.to_user
                } else {
                    f.from_user
                },
                since: f.updated_at,
            })
            .collect();
        friends.sort_by(|a, b| b.since.cmp(&a.since));
        Ok(friends)
    }

    async fn list_pending_received(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        let rel = self.rel.lock().await;
        let mut rows: Vec<Friendship> = rel
            .friendships
            .values()
            .filter(|f| f.status == FriendshipStatus::Pending && f.to_user == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list_pending_sent(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        let rel = self.rel.lock().await;
        let mut rows: Vec<Friendship> = rel
            .friendships
            .values()
            .filter(|f| f.status == FriendshipStatus::Pending && f.from_user == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let mut rel = self.rel.lock().await;
        rel.friendships.remove(&pair_key(blocker, blocked));
        if rel.blocks.contains_key(&(blocker, blocked)) {
            return Ok(false);
        }
        rel.blocks.insert((blocker, blocked), Utc::now());
        Ok(true)
    }

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let mut rel = self.rel.lock().await;
        Ok(rel.blocks.remove(&(blocker, blocked)).is_some())
    }

    async fn has_block_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<(bool, bool, bool)> {
        let rel = self.rel.lock().await;
        Ok(rel.has_block_between(user_a, user_b))
    }

    async fn list_blocked(&self, user: Uuid) -> AppResult<Vec<Block>> {
        let rel = self.rel.lock().await;
        let mut rows: Vec<Block> = rel
            .blocks
            .iter()
            .filter(|((blocker, _), _)| *blocker == user)
            .map(|((blocker, blocked), created_at)| Block {
                blocker_id: *blocker,
                blocked_id: *blocked,
                created_at: *created_at,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl MessageRepository for MemoryStore {
    async fn insert_authorized(&self, msg: NewMessage) -> AppResult<Option<Message>> {
        // Hold the relationship lock across the insert so the write-time
        // gate check and the append are one atomic step, mirroring the SQL
        // INSERT .. SELECT .. WHERE EXISTS form.
        let rel = self.rel.lock().await;
        if !rel.can_exchange(msg.sender_id, msg.receiver_id) {
            return Ok(None);
        }
        let mut messages = self.messages.lock().await;
        let message = Message {
            id: msg.id,
            sender_id: msg.sender_id,
            receiver_id: msg.receiver_id,
            body: msg.body,
            attachment: msg.attachment,
            status: DeliveryStatus::Sent,
            is_read: false,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        };
        messages.push(message.clone());
        Ok(Some(message))
    }

    async fn history_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>> {
        let messages = self.messages.lock().await;
        // Insertion order is creation order; no re-sort needed.
        Ok(messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.receiver_id == user_b)
                    || (m.sender_id == user_b && m.receiver_id == user_a)
            })
            .cloned()
            .collect())
    }

    async fn mark_delivered_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64> {
        let mut messages = self.messages.lock().await;
        let now = Utc::now();
        let mut count = 0u64;
        for m in messages.iter_mut() {
            if m.sender_id == peer && m.receiver_id == viewer && m.status == DeliveryStatus::Sent {
                m.status = DeliveryStatus::Delivered;
                m.delivered_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn mark_read_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64> {
        let mut messages = self.messages.lock().await;
        let now = Utc::now();
        let mut count = 0u64;
        for m in messages.iter_mut() {
            if m.sender_id == peer && m.receiver_id == viewer && !m.is_read {
                m.is_read = true;
                m.status = DeliveryStatus::Read;
                m.read_at = Some(now);
                // Collapsed Delivered hop: both stamps carry the same instant.
                m.delivered_at.get_or_insert(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn advance_one(
        &self,
        message_id: Uuid,
        viewer: Uuid,
    ) -> AppResult<Option<DeliveryStatus>> {
        let mut messages = self.messages.lock().await;
        let Some(m) = messages
            .iter_mut()
            .find(|m| m.id == message_id && m.receiver_id == viewer)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        match m.status {
            DeliveryStatus::Sent => {
                m.status = DeliveryStatus::Delivered;
                m.delivered_at = Some(now);
            }
            DeliveryStatus::Delivered => {
                m.status = DeliveryStatus::Read;
                m.is_read = true;
                m.read_at = Some(now);
            }
            DeliveryStatus::Read => {}
        }
        Ok(Some(m.status))
    }

    async fn unread_count(&self, user: Uuid) -> AppResult<i64> {
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .filter(|m| m.receiver_id == user && !m.is_read)
            .count() as i64)
    }

    async fn unread_recent(&self, user: Uuid, limit: i64) -> AppResult<Vec<(Message, String)>> {
        let messages = self.messages.lock().await;
        let recent: Vec<Message> = messages
            .iter()
            .rev()
            .filter(|m| m.receiver_id == user && !m.is_read)
            .take(limit as usize)
            .cloned()
            .collect();
        drop(messages);

        let users = self.users.lock().await;
        Ok(recent
            .into_iter()
            .map(|m| {
                let username = users
                    .get(&m.sender_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default();
                (m, username)
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn upsert(&self, id: Uuid, username: &str) -> AppResult<User> {
        let mut users = self.users.lock().await;
        let user = users
            .entry(id)
            .and_modify(|u| u.username = username.to_string())
            .or_insert_with(|| User {
                id,
                username: username.to_string(),
                created_at: Utc::now(),
            });
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        if let Ok(id) = Uuid::parse_str(identifier) {
            return self.find_by_id(id).await;
        }
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.username == identifier).cloned())
    }

    async fn search(&self, viewer: Uuid, query: &str, limit: i64) -> AppResult<Vec<User>> {
        let rel = self.rel.lock().await;
        let blocked_pairs: Vec<(Uuid, Uuid)> = rel.blocks.keys().cloned().collect();
        drop(rel);

        let query_lower = query.to_lowercase();
        let users = self.users.lock().await;
        let mut results: Vec<User> = users
            .values()
            .filter(|u| u.id != viewer)
            .filter(|u| u.username.to_lowercase().contains(&query_lower))
            .filter(|u| {
                !blocked_pairs.contains(&(viewer, u.id)) && !blocked_pairs.contains(&(u.id, viewer))
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| a.username.cmp(&b.username));
        results.truncate(limit as usize);
        Ok(results)
    }
}
