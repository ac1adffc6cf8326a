use actix_web::{web, HttpResponse};
use rand::distributions::Alphanumeric;
use rand::Rng;
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::auth::{auth_cookie, clear_cookie, create_token, hash_password, verify_password};
use crate::errors::ApiError;
use crate::models::user::{LoginUser, RegisterUser, User, UserStatus};
use crate::AppState;

fn verification_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUser>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(&body.email)
        .fetch_one(&state.pool)
        .await?;
    if exists {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let password_hash = hash_password(&body.password)?;
    let token = verification_token();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, verify_token)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&body.name)
    .bind(&body.email)
    .bind(&password_hash)
    .bind(&token)
    .fetch_one(&state.pool)
    .await?;

    // Mail transport is a logged no-op; the verify endpoint consumes the token.
    log::info!(
        "verification mail from {} to {}: {}/verify?token={}",
        state.config.mail_from,
        user.email,
        state.config.frontend_url,
        token
    );

    Ok(HttpResponse::Created().json(user))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginUser>,
) -> Result<HttpResponse, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&body.email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if user.status == UserStatus::Disabled {
        return Err(ApiError::Forbidden("account is disabled".to_string()));
    }
    if !verify_password(&user.password_hash, &body.password)? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = create_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    Ok(HttpResponse::Ok()
        .cookie(auth_cookie(token, state.config.token_ttl_hours))
        .json(user))
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(clear_cookie())
        .json(serde_json::json!({ "message": "logged out" }))
}

/// Session check for the SPA: valid cookie -> current user, else 401.
pub async fn validate(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user.id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user no longer exists".to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}
