use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{AttachmentRef, DeliveryStatus, Message};
use crate::repository::{MessageRepository, NewMessage};
use crate::services::{retry_once, AuthorizationGate};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Owns message rows and their delivery-state machine. Admission goes
/// through the authorization gate twice: a pre-check here and a write-time
/// re-validation inside the repository insert.
pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    gate: Arc<AuthorizationGate>,
}

impl MessageService {
    pub fn new(messages: Arc<dyn MessageRepository>, gate: Arc<AuthorizationGate>) -> Self {
        Self { messages, gate }
    }

    pub async fn send(
        &self,
        sender: Uuid,
        receiver: Uuid,
        body: Option<String>,
        attachment: Option<AttachmentRef>,
    ) -> AppResult<Message> {
        // Empty-string bodies count as absent, matching the non-empty rule.
        let body = body.filter(|b| !b.is_empty());
        if body.is_none() && attachment.is_none() {
            return Err(AppError::EmptyMessage);
        }

        if !self.gate.can_exchange(sender, receiver).await? {
            return Err(AppError::Forbidden);
        }

        let new_message = NewMessage {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            body,
            attachment,
        };
        match retry_once(|| self.messages.insert_authorized(new_message.clone())).await? {
            Some(message) => {
                metrics::message_sent();
                debug!(message_id = %message.id, %sender, %receiver, "message stored");
                Ok(message)
            }
            // The pre-check passed but the gate failed at write time: a
            // block or unfriend landed in between. Same denial as above.
            None => Err(AppError::Forbidden),
        }
    }

    /// Ordered history of the pair, advancing delivery state for everything
    /// addressed to the viewer first. History itself is not gated: a block
    /// hides future exchange, not what was already said.
    pub async fn history(&self, viewer: Uuid, peer: Uuid) -> AppResult<Vec<Message>> {
        self.advance_on_view(viewer, peer).await?;
        retry_once(|| self.messages.history_between(viewer, peer)).await
    }

    /// Two-pass bulk advance: everything Sent from the peer becomes
    /// Delivered, then everything unread becomes Read. A message never
    /// individually probed crosses both in one caller-visible hop, with both
    /// stamps set as if traversed in order. Returns the rows that reached
    /// Read.
    pub async fn advance_on_view(&self, viewer: Uuid, peer: Uuid) -> AppResult<u64> {
        let delivered = retry_once(|| self.messages.mark_delivered_from(viewer, peer)).await?;
        let read = retry_once(|| self.messages.mark_read_from(viewer, peer)).await?;
        if delivered > 0 {
            metrics::delivery_transitions("delivered", delivered);
        }
        if read > 0 {
            metrics::delivery_transitions("read", read);
        }
        Ok(read)
    }

    /// Single forward step for one message; only its receiver may probe.
    /// Probing a Read message is a no-op that reports Read.
    pub async fn probe_status(&self, message_id: Uuid, viewer: Uuid) -> AppResult<DeliveryStatus> {
        match retry_once(|| self.messages.advance_one(message_id, viewer)).await? {
            Some(status) => Ok(status),
            // Absent and not-the-receiver collapse into the same answer so
            // probing can't be used to test whether a message id exists.
            None => Err(AppError::NotFound),
        }
    }
}
