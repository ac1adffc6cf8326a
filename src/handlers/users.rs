use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::auth::hash_password;
use crate::errors::ApiError;
use crate::models::user::{ManagerRequest, Role, UpdateUser, User};
use crate::AppState;

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

pub async fn verify_email(
    state: web::Data<AppState>,
    query: web::Query<VerifyQuery>,
) -> Result<HttpResponse, ApiError> {
    let updated = sqlx::query(
        "UPDATE users SET verified = 1, verify_token = NULL WHERE verify_token = ?",
    )
    .bind(&query.token)
    .execute(&state.pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("unknown verification token".to_string()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "email verified" })))
}

pub async fn me(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse, ApiError> {
    let user = fetch_user(&state, user.id).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn list_users(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if user.id != id {
        user.require_role(&[Role::Admin])?;
    }
    let user = fetch_user(&state, id).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if user.id != id {
        user.require_role(&[Role::Admin])?;
    }
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let current = fetch_user(&state, id).await?;
    let name = body.name.clone().unwrap_or(current.name);
    let password_hash = match &body.password {
        Some(password) => hash_password(password)?,
        None => current.password_hash,
    };

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET name = ?, password_hash = ? WHERE id = ? RETURNING *",
    )
    .bind(&name)
    .bind(&password_hash)
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Soft delete: the row stays, the account is disabled.
pub async fn delete_user(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let id = path.into_inner();

    let updated = sqlx::query("UPDATE users SET status = 'disabled' WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("user not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "user disabled", "id": id })))
}

pub async fn manager_request(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::User])?;

    let current = fetch_user(&state, user.id).await?;
    if current.manager_request == ManagerRequest::Pending {
        return Err(ApiError::Conflict(
            "a manager request is already pending".to_string(),
        ));
    }

    sqlx::query("UPDATE users SET manager_request = 'pending' WHERE id = ?")
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "manager request submitted" })))
}

async fn fetch_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))
}
