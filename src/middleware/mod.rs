use crate::error::AppError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, as asserted by the gateway in front of this
/// service via the `x-user-id` header. Absent or malformed means 401.
#[derive(Debug, Clone, Copy)]
pub struct Principal(pub Uuid);

impl Principal {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user_id(req).map(Principal))
    }
}

fn extract_user_id(req: &HttpRequest) -> Result<Uuid, AppError> {
    let header_value = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or(AppError::Unauthorized)?;

    let value = header_value.to_str().map_err(|_| AppError::Unauthorized)?;

    Uuid::parse_str(value).map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn missing_header_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            extract_user_id(&req),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn malformed_uuid_is_unauthorized() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(
            extract_user_id(&req),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn valid_header_yields_principal() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        assert_eq!(extract_user_id(&req).unwrap(), id);
    }
}
