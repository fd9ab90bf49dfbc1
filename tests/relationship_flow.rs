mod common;

use chat_service::error::AppError;
use chat_service::models::{
    FriendshipOutcome, FriendshipStatus, RelationshipKind, RespondDecision,
};
use common::{make_friends, seeded_state};

#[tokio::test]
async fn request_then_accept_enables_exchange() {
    let (state, store, users) = seeded_state().await;

    let outcome = state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();
    let FriendshipOutcome::Requested(request) = outcome else {
        panic!("expected a fresh request");
    };
    assert_eq!(request.from_user, users.alice);
    assert_eq!(request.status, FriendshipStatus::Pending);

    // Pending alone authorizes nothing.
    assert!(!state.gate.can_exchange(users.alice, users.bob).await.unwrap());

    state
        .relationships
        .respond(request.id, users.bob, RespondDecision::Accept)
        .await
        .unwrap();

    assert!(state.gate.can_exchange(users.alice, users.bob).await.unwrap());
    assert!(state.gate.can_exchange(users.bob, users.alice).await.unwrap());
    assert_eq!(
        state
            .relationships
            .relationship_status(users.bob, users.alice)
            .await
            .unwrap(),
        RelationshipKind::Friend
    );

    let friends = state.relationships.list_friends(users.alice).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].user_id, users.bob);

    drop(store);
}

#[tokio::test]
async fn duplicate_request_reports_existing_state() {
    let (state, _store, users) = seeded_state().await;

    state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();

    // Same direction and the reverse both surface the pending request
    // instead of creating a second row.
    let again = state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();
    assert_eq!(
        again,
        FriendshipOutcome::AlreadyPending {
            requested_by: users.alice
        }
    );

    let reverse = state
        .relationships
        .request_friendship(users.bob, users.alice)
        .await
        .unwrap();
    assert_eq!(
        reverse,
        FriendshipOutcome::AlreadyPending {
            requested_by: users.alice
        }
    );
}

#[tokio::test]
async fn request_between_friends_reports_already_friends() {
    let (state, _store, users) = seeded_state().await;
    make_friends(&state, users.alice, users.bob).await;

    let outcome = state
        .relationships
        .request_friendship(users.bob, users.alice)
        .await
        .unwrap();
    assert_eq!(outcome, FriendshipOutcome::AlreadyFriends);
}

#[tokio::test]
async fn self_request_is_rejected() {
    let (state, _store, users) = seeded_state().await;
    let err = state
        .relationships
        .request_friendship(users.alice, users.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SelfTarget));
}

#[tokio::test]
async fn rejected_row_is_recycled_not_duplicated() {
    let (state, store, users) = seeded_state().await;

    let FriendshipOutcome::Requested(first) = state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap()
    else {
        panic!("expected a fresh request");
    };
    state
        .relationships
        .respond(first.id, users.bob, RespondDecision::Reject)
        .await
        .unwrap();

    // The rejected row flips back to pending under the new requester.
    let FriendshipOutcome::Requested(second) = state
        .relationships
        .request_friendship(users.bob, users.alice)
        .await
        .unwrap()
    else {
        panic!("expected the recycled request");
    };
    assert_eq!(second.id, first.id);
    assert_eq!(second.from_user, users.bob);
    assert_eq!(second.status, FriendshipStatus::Pending);

    // Still exactly one row for the pair.
    use chat_service::repository::RelationshipRepository;
    let row = store
        .find_between(users.alice, users.bob)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.id, first.id);

    let received = state
        .relationships
        .list_pending_received(users.alice)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn only_the_addressee_may_respond() {
    let (state, _store, users) = seeded_state().await;

    let FriendshipOutcome::Requested(request) = state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap()
    else {
        panic!("expected a fresh request");
    };

    // The requester can't accept their own request, and a bystander sees
    // nothing either.
    for wrong in [users.alice, users.carol] {
        let err = state
            .relationships
            .respond(request.id, wrong, RespondDecision::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    // Resolving twice fails the second time: the row is no longer pending.
    state
        .relationships
        .respond(request.id, users.bob, RespondDecision::Accept)
        .await
        .unwrap();
    let err = state
        .relationships
        .respond(request.id, users.bob, RespondDecision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn requester_can_cancel_own_pending_request() {
    let (state, _store, users) = seeded_state().await;

    state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();
    state
        .relationships
        .cancel(users.alice, users.bob)
        .await
        .unwrap();

    assert_eq!(
        state
            .relationships
            .relationship_status(users.alice, users.bob)
            .await
            .unwrap(),
        RelationshipKind::None
    );

    // The addressee can't cancel a request pointed at them.
    state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();
    let err = state
        .relationships
        .cancel(users.bob, users.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn unfriend_removes_authorization_and_is_idempotent() {
    let (state, _store, users) = seeded_state().await;
    make_friends(&state, users.alice, users.bob).await;

    state
        .relationships
        .unfriend(users.bob, users.alice)
        .await
        .unwrap();
    assert!(!state.gate.can_exchange(users.alice, users.bob).await.unwrap());

    // Second removal is a quiet no-op.
    state
        .relationships
        .unfriend(users.bob, users.alice)
        .await
        .unwrap();
}

#[tokio::test]
async fn block_severs_friendship_and_forbids_new_requests() {
    let (state, _store, users) = seeded_state().await;
    make_friends(&state, users.alice, users.bob).await;

    state
        .relationships
        .block(users.alice, users.bob)
        .await
        .unwrap();

    assert!(!state.gate.can_exchange(users.alice, users.bob).await.unwrap());
    assert_eq!(
        state
            .relationships
            .relationship_status(users.bob, users.alice)
            .await
            .unwrap(),
        RelationshipKind::Blocked
    );
    assert!(state
        .relationships
        .list_friends(users.alice)
        .await
        .unwrap()
        .is_empty());

    // Neither side can open a new request while the block stands.
    for (from, to) in [(users.bob, users.alice), (users.alice, users.bob)] {
        let err = state
            .relationships
            .request_friendship(from, to)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    // Only the blocker sees the block in their list.
    let blocked = state.relationships.list_blocked(users.alice).await.unwrap();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].blocked_id, users.bob);
    assert!(state
        .relationships
        .list_blocked(users.bob)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unblock_restores_a_clean_slate() {
    let (state, _store, users) = seeded_state().await;
    make_friends(&state, users.alice, users.bob).await;

    state
        .relationships
        .block(users.alice, users.bob)
        .await
        .unwrap();
    state
        .relationships
        .unblock(users.alice, users.bob)
        .await
        .unwrap();

    // The old friendship does not resurrect; the pair starts over.
    assert_eq!(
        state
            .relationships
            .relationship_status(users.alice, users.bob)
            .await
            .unwrap(),
        RelationshipKind::None
    );
    assert!(matches!(
        state
            .relationships
            .request_friendship(users.bob, users.alice)
            .await
            .unwrap(),
        FriendshipOutcome::Requested(_)
    ));
}

#[tokio::test]
async fn blocking_twice_and_self_blocking() {
    let (state, _store, users) = seeded_state().await;

    state
        .relationships
        .block(users.alice, users.bob)
        .await
        .unwrap();
    state
        .relationships
        .block(users.alice, users.bob)
        .await
        .unwrap();
    assert_eq!(
        state
            .relationships
            .list_blocked(users.alice)
            .await
            .unwrap()
            .len(),
        1
    );

    let err = state
        .relationships
        .block(users.alice, users.alice)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SelfTarget));
}

#[tokio::test]
async fn concurrent_cross_requests_produce_one_pending_row() {
    let (state, store, users) = seeded_state().await;

    let (a, b) = tokio::join!(
        state.relationships.request_friendship(users.alice, users.bob),
        state.relationships.request_friendship(users.bob, users.alice),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    // Exactly one caller wins the insert; the other learns a request is
    // already pending against them.
    let fresh = outcomes
        .iter()
        .filter(|o| matches!(o, FriendshipOutcome::Requested(_)))
        .count();
    let pending = outcomes
        .iter()
        .filter(|o| matches!(o, FriendshipOutcome::AlreadyPending { .. }))
        .count();
    assert_eq!((fresh, pending), (1, 1));

    use chat_service::repository::RelationshipRepository;
    let row = store
        .find_between(users.alice, users.bob)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, FriendshipStatus::Pending);
}

#[tokio::test]
async fn status_reflects_pending_direction() {
    let (state, _store, users) = seeded_state().await;
    state
        .relationships
        .request_friendship(users.alice, users.bob)
        .await
        .unwrap();

    assert_eq!(
        state
            .relationships
            .relationship_status(users.alice, users.bob)
            .await
            .unwrap(),
        RelationshipKind::RequestSent
    );
    assert_eq!(
        state
            .relationships
            .relationship_status(users.bob, users.alice)
            .await
            .unwrap(),
        RelationshipKind::RequestReceived
    );
}
