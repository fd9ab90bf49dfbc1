use crate::error::AppError;
use crate::middleware::Principal;
use crate::models::RelationshipKind;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct UserSearchResult {
    pub id: Uuid,
    pub username: String,
    pub relationship: RelationshipKind,
}

/// Username search, excluding the caller and anyone sharing a block with
/// them; each hit is annotated with the caller's relationship to it.
/// GET /api/v1/users/search?q=
#[get("/users/search")]
pub async fn search_users(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let viewer = principal.id();
    let users = state.users.search(viewer, &query.q, SEARCH_LIMIT).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in users {
        let relationship = state
            .relationships
            .relationship_status(viewer, user.id)
            .await?;
        results.push(UserSearchResult {
            id: user.id,
            username: user.username,
            relationship,
        });
    }

    Ok(HttpResponse::Ok().json(results))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(search_users);
}
