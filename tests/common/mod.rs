#![allow(dead_code)]

use chat_service::models::{FriendshipOutcome, RespondDecision};
use chat_service::repository::{MemoryStore, UserRepository};
use chat_service::state::AppState;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestUsers {
    pub alice: Uuid,
    pub bob: Uuid,
    pub carol: Uuid,
}

/// In-memory state with three seeded users. The same store backs all three
/// repository seams.
pub async fn seeded_state() -> (AppState, Arc<MemoryStore>, TestUsers) {
    let store = Arc::new(MemoryStore::new());
    let users = TestUsers {
        alice: Uuid::new_v4(),
        bob: Uuid::new_v4(),
        carol: Uuid::new_v4(),
    };
    store.upsert(users.alice, "alice").await.unwrap();
    store.upsert(users.bob, "bob").await.unwrap();
    store.upsert(users.carol, "carol").await.unwrap();

    let state = AppState::new(store.clone(), store.clone(), store.clone());
    (state, store, users)
}

/// Drive a full request/accept handshake between two users.
pub async fn make_friends(state: &AppState, requester: Uuid, accepter: Uuid) {
    let outcome = state
        .relationships
        .request_friendship(requester, accepter)
        .await
        .unwrap();
    let FriendshipOutcome::Requested(f) = outcome else {
        panic!("expected a fresh friend request");
    };
    state
        .relationships
        .respond(f.id, accepter, RespondDecision::Accept)
        .await
        .unwrap();
}
