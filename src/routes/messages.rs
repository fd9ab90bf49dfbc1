use crate::error::AppError;
use crate::middleware::Principal;
use crate::state::AppState;
use actix_web::{post, web, HttpResponse};
use uuid::Uuid;

/// Advance a single message one delivery step and report where it landed.
/// Only the receiver may probe; anyone else sees 404.
/// POST /api/v1/messages/{id}/probe
#[post("/messages/{id}/probe")]
pub async fn probe_message(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let status = state
        .messages
        .probe_status(path.into_inner(), principal.id())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": status })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(probe_message);
}
