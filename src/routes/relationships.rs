use crate::error::AppError;
use crate::middleware::Principal;
use crate::models::{FriendshipOutcome, RespondDecision};
use crate::state::AppState;
use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    /// Username or textual uuid of the target user.
    pub identifier: String,
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub decision: RespondDecision,
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RelationshipListQuery {
    pub kind: String,
}

/// Ask for a friendship with another user, addressed by username or id.
/// POST /api/v1/friends/requests
#[post("/friends/requests")]
pub async fn request_friendship(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<FriendRequestBody>,
) -> Result<HttpResponse, AppError> {
    let target = state
        .users
        .find_by_identifier(&body.identifier)
        .await?
        .ok_or(AppError::NotFound)?;

    let response = match state
        .relationships
        .request_friendship(principal.id(), target.id)
        .await?
    {
        FriendshipOutcome::Requested(f) => HttpResponse::Created().json(serde_json::json!({
            "status": "requested",
            "request": f,
        })),
        FriendshipOutcome::AlreadyFriends => HttpResponse::Ok().json(serde_json::json!({
            "status": "already_friends",
        })),
        FriendshipOutcome::AlreadyPending { requested_by } => {
            HttpResponse::Ok().json(serde_json::json!({
                "status": "already_pending",
                "requested_by": requested_by,
            }))
        }
    };
    Ok(response)
}

/// Accept or reject a pending request addressed to the caller.
/// POST /api/v1/friends/requests/{request_id}/respond
#[post("/friends/requests/{request_id}/respond")]
pub async fn respond_to_request(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<RespondBody>,
) -> Result<HttpResponse, AppError> {
    state
        .relationships
        .respond(path.into_inner(), principal.id(), body.decision)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

/// Withdraw the caller's own pending request toward a user.
/// DELETE /api/v1/friends/requests/{user_id}
#[delete("/friends/requests/{user_id}")]
pub async fn cancel_request(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .relationships
        .cancel(principal.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// End a friendship. Removing one that is already gone still succeeds.
/// DELETE /api/v1/friends/{user_id}
#[delete("/friends/{user_id}")]
pub async fn unfriend(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .relationships
        .unfriend(principal.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Block a user. Idempotent; severs any friendship atomically.
/// POST /api/v1/blocks
#[post("/blocks")]
pub async fn block_user(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<BlockBody>,
) -> Result<HttpResponse, AppError> {
    state
        .relationships
        .block(principal.id(), body.user_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Lift the caller's own block on a user.
/// DELETE /api/v1/blocks/{user_id}
#[delete("/blocks/{user_id}")]
pub async fn unblock_user(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state
        .relationships
        .unblock(principal.id(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// List the caller's relationships by kind.
/// GET /api/v1/relationships?kind=friends|pending_sent|pending_received|blocked
#[get("/relationships")]
pub async fn list_relationships(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<RelationshipListQuery>,
) -> Result<HttpResponse, AppError> {
    let user = principal.id();
    let response = match query.kind.as_str() {
        "friends" => HttpResponse::Ok().json(state.relationships.list_friends(user).await?),
        "pending_sent" => {
            HttpResponse::Ok().json(state.relationships.list_pending_sent(user).await?)
        }
        "pending_received" => {
            HttpResponse::Ok().json(state.relationships.list_pending_received(user).await?)
        }
        "blocked" => HttpResponse::Ok().json(state.relationships.list_blocked(user).await?),
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown relationship kind: {other}"
            )))
        }
    };
    Ok(response)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(request_friendship)
        .service(respond_to_request)
        .service(cancel_request)
        .service(unfriend)
        .service(block_user)
        .service(unblock_user)
        .service(list_relationships);
}
