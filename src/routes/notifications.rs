use crate::error::AppError;
use crate::middleware::Principal;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};

/// Unread summary for the caller: total count plus the newest previews.
/// GET /api/v1/notifications
#[get("/notifications")]
pub async fn unread_summary(
    state: web::Data<AppState>,
    principal: Principal,
) -> Result<HttpResponse, AppError> {
    let summary = state.notifications.unread_summary(principal.id()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(unread_summary);
}
