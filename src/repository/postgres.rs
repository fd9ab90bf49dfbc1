use crate::error::{AppError, AppResult};
use crate::models::{
    AttachmentRef, Block, DeliveryStatus, FriendEntry, Friendship, FriendshipStatus, Message,
    RespondDecision, User,
};
use crate::repository::traits::{
    MessageRepository, NewMessage, PairUpsert, RelationshipRepository, UserRepository,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL store (source of truth in production). All state-advancing
/// statements are guarded by the row's current status so concurrent callers
/// resolve to benign no-ops instead of double stamps.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("health check failed: {e}")))?;
        Ok(())
    }
}

fn friendship_from_row(row: &PgRow) -> AppResult<Friendship> {
    let status: String = row.get("status");
    let status = FriendshipStatus::parse(&status)
        .ok_or_else(|| AppError::Database(format!("unknown friendship status: {status}")))?;
    Ok(Friendship {
        id: row.get("id"),
        from_user: row.get("from_user"),
        to_user: row.get("to_user"),
        status,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn message_from_row(row: &PgRow) -> AppResult<Message> {
    let status: String = row.get("status");
    let status = DeliveryStatus::parse(&status)
        .ok_or_else(|| AppError::Database(format!("unknown delivery status: {status}")))?;
    let attachment_key: Option<String> = row.get("attachment_key");
    let attachment = attachment_key.map(|key| AttachmentRef {
        key,
        file_name: row.get("attachment_name"),
    });
    Ok(Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        body: row.get("body"),
        attachment,
        status,
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
        delivered_at: row.get("delivered_at"),
        read_at: row.get("read_at"),
    })
}

const FRIENDSHIP_COLUMNS: &str = "id, from_user, to_user, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, body, attachment_key, attachment_name, \
                               status, is_read, created_at, delivered_at, read_at";

#[async_trait::async_trait]
impl RelationshipRepository for PostgresStore {
    async fn upsert_pending(&self, from: Uuid, to: Uuid) -> AppResult<PairUpsert> {
        let new_id = Uuid::new_v4();

        // Single statement keyed on the normalized pair: inserts a fresh
        // pending row, or recycles a rejected row in place. A live pending or
        // accepted row makes the statement a no-op returning nothing.
        let sql = format!(
            "INSERT INTO friendships (id, from_user, to_user, status) \
             VALUES ($1, $2, $3, 'pending') \
             ON CONFLICT (user_lo, user_hi) DO UPDATE \
             SET from_user = EXCLUDED.from_user, \
                 to_user = EXCLUDED.to_user, \
                 status = 'pending', \
                 updated_at = NOW() \
             WHERE friendships.status = 'rejected' \
             RETURNING {FRIENDSHIP_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(new_id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("upsert_pending failed: {e}")))?;

        if let Some(row) = row {
            let friendship = friendship_from_row(&row)?;
            // DO UPDATE keeps the original id, so a recycled row still
            // carries it; only a fresh insert carries ours.
            let upsert = if friendship.id == new_id {
                PairUpsert::Inserted(friendship)
            } else {
                PairUpsert::Recycled(friendship)
            };
            debug!(%from, %to, "friendship upsert applied");
            return Ok(upsert);
        }

        // Lost to (or arrived after) a live row; surface it for
        // classification. If it vanished between statements the caller lost
        // a race to a delete and may simply retry.
        match self.find_between(from, to).await? {
            Some(existing) => Ok(PairUpsert::Existing(existing)),
            None => Err(AppError::Conflict),
        }
    }

    async fn respond(
        &self,
        request_id: Uuid,
        responder: Uuid,
        decision: RespondDecision,
    ) -> AppResult<bool> {
        let status = match decision {
            RespondDecision::Accept => FriendshipStatus::Accepted,
            RespondDecision::Reject => FriendshipStatus::Rejected,
        };
        let result = sqlx::query(
            "UPDATE friendships SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND to_user = $2 AND status = 'pending'",
        )
        .bind(request_id)
        .bind(responder)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("respond failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel_pending(&self, requester: Uuid, target: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM friendships \
             WHERE from_user = $1 AND to_user = $2 AND status = 'pending'",
        )
        .bind(requester)
        .bind(target)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("cancel_pending failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_accepted(&self, user_a: Uuid, user_b: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM friendships \
             WHERE status = 'accepted' \
               AND ((from_user = $1 AND to_user = $2) OR (from_user = $2 AND to_user = $1))",
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("delete_accepted failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Option<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE (from_user = $1 AND to_user = $2) OR (from_user = $2 AND to_user = $1)"
        );
        let row = sqlx::query(&sql)
            .bind(user_a)
            .bind(user_b)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("find_between failed: {e}")))?;

        row.as_ref().map(friendship_from_row).transpose()
    }

    async fn list_friends(&self, user: Uuid) -> AppResult<Vec<FriendEntry>> {
        let rows = sqlx::query(
            "SELECT CASE WHEN from_user = $1 THEN to_user ELSE from_user END AS user_id, \
                    updated_at \
             FROM friendships \
             WHERE status = 'accepted' AND (from_user = $1 OR to_user = $1) \
             ORDER BY updated_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("list_friends failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| FriendEntry {
                user_id: r.get("user_id"),
                since: r.get("updated_at"),
            })
            .collect())
    }

    async fn list_pending_received(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE to_user = $1 AND status = 'pending' ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("list_pending_received failed: {e}")))?;

        rows.iter().map(friendship_from_row).collect()
    }

    async fn list_pending_sent(&self, user: Uuid) -> AppResult<Vec<Friendship>> {
        let sql = format!(
            "SELECT {FRIENDSHIP_COLUMNS} FROM friendships \
             WHERE from_user = $1 AND status = 'pending' ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("list_pending_sent failed: {e}")))?;

        rows.iter().map(friendship_from_row).collect()
    }

    async fn create_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        // Friendship removal and block insertion are one transaction; a
        // concurrent send racing this still gets rejected at its own write
        // because the insert re-validates against both tables.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("create_block begin failed: {e}")))?;

        sqlx::query(
            "DELETE FROM friendships \
             WHERE (from_user = $1 AND to_user = $2) OR (from_user = $2 AND to_user = $1)",
        )
        .bind(blocker)
        .bind(blocked)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(format!("create_block friendship delete failed: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2) \
             ON CONFLICT (blocker_id, blocked_id) DO NOTHING",
        )
        .bind(blocker)
        .bind(blocked)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(format!("create_block insert failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(format!("create_block commit failed: {e}")))?;

        debug!(%blocker, %blocked, "block created");
        Ok(result.rows_affected() > 0)
    }

    async fn delete_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker)
            .bind(blocked)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("delete_block failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_block_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<(bool, bool, bool)> {
        let row = sqlx::query(
            "SELECT \
                EXISTS(SELECT 1 FROM blocks WHERE blocker_id = $1 AND blocked_id = $2) AS a_b, \
                EXISTS(SELECT 1 FROM blocks WHERE blocker_id = $2 AND blocked_id = $1) AS b_a",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("has_block_between failed: {e}")))?;

        let a_b: bool = row.get("a_b");
        let b_a: bool = row.get("b_a");
        Ok((a_b || b_a, a_b, b_a))
    }

    async fn list_blocked(&self, user: Uuid) -> AppResult<Vec<Block>> {
        let rows = sqlx::query(
            "SELECT blocker_id, blocked_id, created_at FROM blocks \
             WHERE blocker_id = $1 ORDER BY created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("list_blocked failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| Block {
                blocker_id: r.get("blocker_id"),
                blocked_id: r.get("blocked_id"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl MessageRepository for PostgresStore {
    async fn insert_authorized(&self, msg: NewMessage) -> AppResult<Option<Message>> {
        // Authorization re-validated at the point of persistence: the row
        // only lands if an accepted friendship exists and no block does at
        // write time, closing the window a stale pre-check leaves open.
        let sql = format!(
            "INSERT INTO messages (id, sender_id, receiver_id, body, attachment_key, attachment_name) \
             SELECT $1, $2, $3, $4, $5, $6 \
             WHERE EXISTS (SELECT 1 FROM friendships \
                           WHERE status = 'accepted' \
                             AND ((from_user = $2 AND to_user = $3) \
                               OR (from_user = $3 AND to_user = $2))) \
               AND NOT EXISTS (SELECT 1 FROM blocks \
                               WHERE (blocker_id = $2 AND blocked_id = $3) \
                                  OR (blocker_id = $3 AND blocked_id = $2)) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let (attachment_key, attachment_name) = match &msg.attachment {
            Some(a) => (Some(a.key.clone()), a.file_name.clone()),
            None => (None, None),
        };
        let row = sqlx::query(&sql)
            .bind(msg.id)
            .bind(msg.sender_id)
            .bind(msg.receiver_id)
            .bind(&msg.body)
            .bind(attachment_key)
            .bind(attachment_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("insert_authorized failed: {e}")))?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn history_between(&self, user_a: Uuid, user_b: Uuid) -> AppResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE (sender_id = $1 AND receiver_id = $2) \
                OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_a)
            .bind(user_b)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("history_between failed: {e}")))?;

        rows.iter().map(message_from_row).collect()
    }

    async fn mark_delivered_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'delivered', delivered_at = NOW() \
             WHERE sender_id = $2 AND receiver_id = $1 AND status = 'sent'",
        )
        .bind(viewer)
        .bind(peer)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("mark_delivered_from failed: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn mark_read_from(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64> {
        // delivered_at backfill covers rows that never saw the Delivered
        // pass; both stamps then carry the same instant.
        let result = sqlx::query(
            "UPDATE messages \
             SET is_read = TRUE, status = 'read', read_at = NOW(), \
                 delivered_at = COALESCE(delivered_at, NOW()) \
             WHERE sender_id = $2 AND receiver_id = $1 AND is_read = FALSE",
        )
        .bind(viewer)
        .bind(peer)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("mark_read_from failed: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn advance_one(
        &self,
        message_id: Uuid,
        viewer: Uuid,
    ) -> AppResult<Option<DeliveryStatus>> {
        // Guarded single-step transitions; whichever statement matches the
        // row's current state wins, racing callers fall through harmlessly.
        let delivered = sqlx::query(
            "UPDATE messages SET status = 'delivered', delivered_at = NOW() \
             WHERE id = $1 AND receiver_id = $2 AND status = 'sent' \
             RETURNING status",
        )
        .bind(message_id)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("advance_one delivered failed: {e}")))?;

        if delivered.is_some() {
            return Ok(Some(DeliveryStatus::Delivered));
        }

        let read = sqlx::query(
            "UPDATE messages \
             SET status = 'read', is_read = TRUE, read_at = NOW() \
             WHERE id = $1 AND receiver_id = $2 AND status = 'delivered' \
             RETURNING status",
        )
        .bind(message_id)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("advance_one read failed: {e}")))?;

        if read.is_some() {
            return Ok(Some(DeliveryStatus::Read));
        }

        let current = sqlx::query(
            "SELECT status FROM messages WHERE id = $1 AND receiver_id = $2",
        )
        .bind(message_id)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("advance_one probe failed: {e}")))?;

        match current {
            Some(row) => {
                let status: String = row.get("status");
                Ok(DeliveryStatus::parse(&status))
            }
            None => Ok(None),
        }
    }

    async fn unread_count(&self, user: Uuid) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("unread_count failed: {e}")))
    }

    async fn unread_recent(&self, user: Uuid, limit: i64) -> AppResult<Vec<(Message, String)>> {
        let sql = format!(
            "SELECT m.id, m.sender_id, m.receiver_id, m.body, m.attachment_key, \
                    m.attachment_name, m.status, m.is_read, m.created_at, m.delivered_at, \
                    m.read_at, u.username \
             FROM messages m \
             JOIN users u ON u.id = m.sender_id \
             WHERE m.receiver_id = $1 AND m.is_read = FALSE \
             ORDER BY m.created_at DESC \
             LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(user)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("unread_recent failed: {e}")))?;

        rows.iter()
            .map(|r| Ok((message_from_row(r)?, r.get("username"))))
            .collect()
    }
}

#[async_trait::async_trait]
impl UserRepository for PostgresStore {
    async fn upsert(&self, id: Uuid, username: &str) -> AppResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (id, username) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username \
             RETURNING id, username, created_at",
        )
        .bind(id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("user upsert failed: {e}")))?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            created_at: row.get("created_at"),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("find_by_id failed: {e}")))?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            username: r.get("username"),
            created_at: r.get("created_at"),
        }))
    }

    async fn find_by_identifier(&self, identifier: &str) -> AppResult<Option<User>> {
        if let Ok(id) = Uuid::parse_str(identifier) {
            return self.find_by_id(id).await;
        }
        let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("find_by_identifier failed: {e}")))?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            username: r.get("username"),
            created_at: r.get("created_at"),
        }))
    }

    async fn search(&self, viewer: Uuid, query: &str, limit: i64) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, username, created_at FROM users u \
             WHERE u.id <> $1 \
               AND u.username ILIKE '%' || $2 || '%' \
               AND NOT EXISTS (SELECT 1 FROM blocks b \
                               WHERE (b.blocker_id = $1 AND b.blocked_id = u.id) \
                                  OR (b.blocker_id = u.id AND b.blocked_id = $1)) \
             ORDER BY u.username ASC \
             LIMIT $3",
        )
        .bind(viewer)
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("user search failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| User {
                id: r.get("id"),
                username: r.get("username"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
