use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("operation targets the calling user")]
    SelfTarget,

    #[error("message has no body and no attachment")]
    EmptyMessage,

    #[error("conflicting concurrent update")]
    Conflict,

    #[error("database error: {0}")]
    Database(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl AppError {
    /// Transient store failures worth one retry; everything else is semantic.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(msg) => {
                msg.contains("PoolTimedOut") || msg.contains("PoolClosed") || msg.contains("Io")
            }
            AppError::Unavailable(_) => true,
            _ => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::SelfTarget | AppError::EmptyMessage => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::NotFound => 404,
            AppError::Conflict => 409,
            AppError::Unavailable(_) => 503,
            _ => 500,
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(self.status_code())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        // Denials stay generic: a blocked caller and a never-connected caller
        // must receive identical bodies (relationship existence is private).
        let message = match self {
            AppError::Forbidden => "forbidden".to_string(),
            AppError::NotFound => "not found".to_string(),
            AppError::Database(_) | AppError::Internal | AppError::StartServer(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_errors_are_not_retryable() {
        assert!(!AppError::Forbidden.is_retryable());
        assert!(!AppError::EmptyMessage.is_retryable());
        assert!(!AppError::NotFound.is_retryable());
        assert!(!AppError::Database("duplicate key".into()).is_retryable());
    }

    #[test]
    fn pool_timeouts_are_retryable() {
        assert!(AppError::Database("PoolTimedOut".into()).is_retryable());
        assert!(AppError::Unavailable("store down".into()).is_retryable());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::SelfTarget.status_code(), 400);
        assert_eq!(AppError::EmptyMessage.status_code(), 400);
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::Forbidden.status_code(), 403);
        assert_eq!(AppError::NotFound.status_code(), 404);
        assert_eq!(AppError::Conflict.status_code(), 409);
        assert_eq!(AppError::Unavailable("x".into()).status_code(), 503);
    }
}
