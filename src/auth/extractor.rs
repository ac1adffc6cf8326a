use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};

use crate::auth::{decode_token, TOKEN_COOKIE};
use crate::errors::ApiError;
use crate::models::user::Role;
use crate::AppState;

/// The authenticated caller, decoded from the token cookie.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "insufficient role for this operation".to_string(),
            ))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .app_data::<web::Data<AppState>>()
            .ok_or(ApiError::Internal)
            .and_then(|state| {
                let cookie = req
                    .cookie(TOKEN_COOKIE)
                    .ok_or_else(|| ApiError::Unauthorized("missing token".to_string()))?;
                let claims = decode_token(cookie.value(), &state.config.jwt_secret)?;
                Ok(AuthUser {
                    id: claims.sub,
                    role: claims.role,
                })
            });
        ready(result)
    }
}
