use crate::repository::{MessageRepository, RelationshipRepository, UserRepository};
use crate::services::{
    AuthorizationGate, MessageService, NotificationService, RelationshipService,
};
use std::sync::Arc;

/// Shared handles for request handlers. Services hold trait-object
/// repositories, so the same state shape serves the Postgres backend in
/// production and the in-memory backend in tests.
pub struct AppState {
    pub relationships: Arc<RelationshipService>,
    pub messages: Arc<MessageService>,
    pub notifications: Arc<NotificationService>,
    pub gate: Arc<AuthorizationGate>,
    pub users: Arc<dyn UserRepository>,
}

impl AppState {
    pub fn new(
        relationship_repo: Arc<dyn RelationshipRepository>,
        message_repo: Arc<dyn MessageRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        let gate = Arc::new(AuthorizationGate::new(relationship_repo.clone()));
        Self {
            relationships: Arc::new(RelationshipService::new(relationship_repo)),
            messages: Arc::new(MessageService::new(message_repo.clone(), gate.clone())),
            notifications: Arc::new(NotificationService::new(message_repo)),
            gate,
            users: user_repo,
        }
    }
}
