use crate::error::AppError;
use crate::middleware::Principal;
use crate::models::AttachmentRef;
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: Option<String>,
    pub attachment: Option<AttachmentRef>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub authorized: bool,
    pub messages: Vec<crate::models::Message>,
}

async fn conversation_view(
    state: &AppState,
    viewer: Uuid,
    peer: Uuid,
) -> Result<ConversationResponse, AppError> {
    // History is served even when exchange is shut off; the flag tells the
    // client whether sending is currently possible.
    let authorized = state.gate.can_exchange(viewer, peer).await?;
    let messages = state.messages.history(viewer, peer).await?;
    Ok(ConversationResponse {
        authorized,
        messages,
    })
}

/// View a conversation, advancing delivery state for the viewer's inbound
/// messages.
/// GET /api/v1/conversations/{peer_id}
#[get("/conversations/{peer_id}")]
pub async fn view_conversation(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let view = conversation_view(&state, principal.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Polling alias with identical semantics, kept separate so clients on a
/// refresh loop hit a distinct path in access logs.
/// GET /api/v1/conversations/{peer_id}/poll
#[get("/conversations/{peer_id}/poll")]
pub async fn poll_conversation(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let view = conversation_view(&state, principal.id(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Send a message to a peer.
/// POST /api/v1/conversations/{peer_id}/messages
#[post("/conversations/{peer_id}/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let peer = path.into_inner();
    let req = body.into_inner();
    let message = state
        .messages
        .send(principal.id(), peer, req.body, req.attachment)
        .await?;
    Ok(HttpResponse::Created().json(message))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(view_conversation)
        .service(poll_conversation)
        .service(send_message);
}
