use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::errors::ApiError;
use crate::models::hotel::{Hotel, VerificationStatus};
use crate::models::user::{Role, User};
use crate::AppState;

#[derive(Deserialize)]
pub struct VerifyDecision {
    pub decision: VerificationStatus,
}

#[derive(Deserialize)]
pub struct ManagerDecision {
    pub approve: bool,
}

pub async fn pending_hotels(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let hotels = sqlx::query_as::<_, Hotel>(
        "SELECT * FROM hotels WHERE verification_status = 'Pending' ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(HttpResponse::Ok().json(hotels))
}

pub async fn verify_hotel(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<VerifyDecision>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    if body.decision == VerificationStatus::Pending {
        return Err(ApiError::BadRequest(
            "decision must be Success or Fail".to_string(),
        ));
    }

    let hotel = sqlx::query_as::<_, Hotel>(
        "UPDATE hotels SET verification_status = ? WHERE id = ? RETURNING *",
    )
    .bind(body.decision)
    .bind(path.into_inner())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::NotFound("hotel not found".to_string()))?;

    log::info!(
        "hotel {} verification set to {:?} by admin {}",
        hotel.id,
        hotel.verification_status,
        user.id
    );
    Ok(HttpResponse::Ok().json(hotel))
}

pub async fn manager_requests(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE manager_request = 'pending' ORDER BY id",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(HttpResponse::Ok().json(users))
}

pub async fn decide_manager_request(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<ManagerDecision>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let id = path.into_inner();

    let pending: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND manager_request = 'pending')",
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await?;
    if !pending {
        return Err(ApiError::NotFound(
            "no pending manager request for this user".to_string(),
        ));
    }

    let updated = if body.approve {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = 'hotel_manager', manager_request = 'none' WHERE id = ? RETURNING *",
        )
    } else {
        sqlx::query_as::<_, User>(
            "UPDATE users SET manager_request = 'none' WHERE id = ? RETURNING *",
        )
    }
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}
