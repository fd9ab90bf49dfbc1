pub mod conversations;
pub mod messages;
pub mod notifications;
pub mod relationships;
pub mod users;

use actix_web::{web, HttpResponse, Responder};

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Register every /api/v1 route group.
pub fn configure(cfg: &mut web::ServiceConfig) {
    conversations::configure(cfg);
    messages::configure(cfg);
    notifications::configure(cfg);
    relationships::configure(cfg);
    users::configure(cfg);
}
