use crate::error::AppResult;
use crate::models::Message;
use crate::repository::MessageRepository;
use crate::services::retry_once;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const RECENT_LIMIT: i64 = 5;
const EXCERPT_CHARS: usize = 50;
const ATTACHMENT_PLACEHOLDER: &str = "Sent an attachment";

#[derive(Debug, Clone, Serialize)]
pub struct UnreadPreview {
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
    pub has_attachment: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadSummary {
    pub count: i64,
    pub recent: Vec<UnreadPreview>,
}

/// Read-only projection over the message store: unread count plus the five
/// newest unread previews. Never advances delivery state, so notification
/// polling cannot race a user's open conversation view.
pub struct NotificationService {
    messages: Arc<dyn MessageRepository>,
}

impl NotificationService {
    pub fn new(messages: Arc<dyn MessageRepository>) -> Self {
        Self { messages }
    }

    pub async fn unread_summary(&self, user: Uuid) -> AppResult<UnreadSummary> {
        let count = retry_once(|| self.messages.unread_count(user)).await?;
        let recent = retry_once(|| self.messages.unread_recent(user, RECENT_LIMIT))
            .await?
            .into_iter()
            .map(|(message, sender_username)| UnreadPreview {
                message_id: message.id,
                sender_id: message.sender_id,
                sender_username,
                excerpt: excerpt_of(&message),
                created_at: message.created_at,
                has_attachment: message.has_attachment(),
            })
            .collect();

        Ok(UnreadSummary { count, recent })
    }
}

fn excerpt_of(message: &Message) -> String {
    match &message.body {
        Some(body) if !body.is_empty() => body.chars().take(EXCERPT_CHARS).collect(),
        _ if message.has_attachment() => ATTACHMENT_PLACEHOLDER.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachmentRef, DeliveryStatus};

    fn message(body: Option<&str>, attachment: bool) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            body: body.map(str::to_string),
            attachment: attachment.then(|| AttachmentRef {
                key: "chat_files/report.pdf".into(),
                file_name: Some("report.pdf".into()),
            }),
            status: DeliveryStatus::Sent,
            is_read: false,
            created_at: Utc::now(),
            delivered_at: None,
            read_at: None,
        }
    }

    #[test]
    fn excerpt_truncates_to_fifty_chars() {
        let long = "x".repeat(120);
        let m = message(Some(&long), false);
        assert_eq!(excerpt_of(&m).chars().count(), 50);
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(60);
        let m = message(Some(&body), false);
        assert_eq!(excerpt_of(&m), "é".repeat(50));
    }

    #[test]
    fn attachment_only_message_uses_placeholder() {
        let m = message(None, true);
        assert_eq!(excerpt_of(&m), ATTACHMENT_PLACEHOLDER);
        let m = message(Some(""), true);
        assert_eq!(excerpt_of(&m), ATTACHMENT_PLACEHOLDER);
    }
}
