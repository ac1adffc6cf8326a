use actix_web::{web, HttpResponse};
use sqlx::{Sqlite, Transaction};
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::errors::ApiError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::feedback::{CreateFeedback, Feedback, UpdateFeedback};
use crate::AppState;

pub async fn create_feedback(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateFeedback>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(body.booking_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("booking not found".to_string()))?;

    if booking.user_id != user.id {
        return Err(ApiError::Forbidden("not your booking".to_string()));
    }
    // Only a completed stay can be reviewed.
    if matches!(booking.status, BookingStatus::Pending | BookingStatus::Canceled) {
        return Err(ApiError::BadRequest(
            "feedback requires a confirmed booking".to_string(),
        ));
    }

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM feedback WHERE booking_id = ?)")
            .bind(booking.id)
            .fetch_one(&state.pool)
            .await?;
    if exists {
        return Err(ApiError::Conflict(
            "feedback already submitted for this booking".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (user_id, hotel_id, booking_id, rating, comment)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(booking.hotel_id)
    .bind(booking.id)
    .bind(body.rating)
    .bind(&body.comment)
    .fetch_one(&mut *tx)
    .await?;

    recompute_hotel_rating(&mut tx, booking.hotel_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Created().json(feedback))
}

pub async fn hotel_feedback(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let hotel_id = path.into_inner();
    let feedback = sqlx::query_as::<_, Feedback>(
        "SELECT * FROM feedback WHERE hotel_id = ? ORDER BY id DESC",
    )
    .bind(hotel_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(HttpResponse::Ok().json(feedback))
}

pub async fn update_feedback(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateFeedback>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let feedback = fetch_feedback(&state, path.into_inner()).await?;
    if feedback.user_id != user.id {
        return Err(ApiError::Forbidden("not your feedback".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    let updated = sqlx::query_as::<_, Feedback>(
        "UPDATE feedback SET rating = ?, comment = ? WHERE id = ? RETURNING *",
    )
    .bind(body.rating.unwrap_or(feedback.rating))
    .bind(body.comment.clone().unwrap_or(feedback.comment))
    .bind(feedback.id)
    .fetch_one(&mut *tx)
    .await?;

    recompute_hotel_rating(&mut tx, updated.hotel_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_feedback(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let feedback = fetch_feedback(&state, path.into_inner()).await?;
    if feedback.user_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden("not your feedback".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM feedback WHERE id = ?")
        .bind(feedback.id)
        .execute(&mut *tx)
        .await?;
    recompute_hotel_rating(&mut tx, feedback.hotel_id).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "feedback deleted",
        "id": feedback.id
    })))
}

/// The hotel's aggregate rating follows its feedback inside the same
/// transaction as the write that changed it.
async fn recompute_hotel_rating(
    tx: &mut Transaction<'_, Sqlite>,
    hotel_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE hotels
        SET rating = (SELECT COALESCE(AVG(rating), 0) FROM feedback WHERE hotel_id = ?)
        WHERE id = ?
        "#,
    )
    .bind(hotel_id)
    .bind(hotel_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn fetch_feedback(state: &AppState, id: i64) -> Result<Feedback, ApiError> {
    sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("feedback not found".to_string()))
}
