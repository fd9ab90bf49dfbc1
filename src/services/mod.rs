pub mod authorization;
pub mod message_service;
pub mod notification_service;
pub mod relationship_service;

pub use authorization::AuthorizationGate;
pub use message_service::MessageService;
pub use notification_service::{NotificationService, UnreadPreview, UnreadSummary};
pub use relationship_service::RelationshipService;

use crate::error::{AppError, AppResult};
use std::future::Future;

/// Retry a repository call once when the failure is transient, then surface
/// `Unavailable`. Semantic errors pass through untouched on both attempts.
pub(crate) async fn retry_once<T, F, Fut>(op: F) -> AppResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            tracing::warn!(error = %e, "transient store failure, retrying once");
            match op().await {
                Err(e2) if e2.is_retryable() => Err(AppError::Unavailable(e2.to_string())),
                other => other,
            }
        }
        other => other,
    }
}
