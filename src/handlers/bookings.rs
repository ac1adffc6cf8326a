use actix_web::{web, HttpResponse};
use sqlx::QueryBuilder;
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::availability::{room_conflicts, validate_range};
use crate::errors::ApiError;
use crate::models::booking::{
    Booking, BookingDetail, BookingSearch, BookingStatus, CreateBooking, StatusUpdate,
};
use crate::models::hotel::{Hotel, VerificationStatus};
use crate::models::room::Room;
use crate::models::user::Role;
use crate::AppState;

pub async fn create_booking(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateBooking>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_range(body.check_in, body.check_out)?;

    // Held across the whole check-then-insert section: two overlapping
    // requests serialize here, so exactly one can win.
    let _guard = state.reservation.lock().await;

    let mut tx = state.pool.begin().await?;

    let hotel = sqlx::query_as::<_, Hotel>("SELECT * FROM hotels WHERE id = ?")
        .bind(body.hotel_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::BadRequest("hotel not found".to_string()))?;
    if hotel.verification_status != VerificationStatus::Success {
        return Err(ApiError::BadRequest("hotel is not verified".to_string()));
    }

    let mut rooms = Vec::with_capacity(body.room_ids.len());
    for &room_id in &body.room_ids {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ? AND hotel_id = ?")
            .bind(room_id)
            .bind(hotel.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("room {room_id} not found for this hotel"))
            })?;
        rooms.push(room);
    }

    let duplicate: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE user_id = ? AND hotel_id = ? AND check_in = ? AND check_out = ?
            AND status IN ('pending', 'success')
        )
        "#,
    )
    .bind(user.id)
    .bind(hotel.id)
    .bind(body.check_in)
    .bind(body.check_out)
    .fetch_one(&mut *tx)
    .await?;
    if duplicate {
        return Err(ApiError::Conflict(
            "an identical booking already exists".to_string(),
        ));
    }

    for room in &rooms {
        if room_conflicts(&mut *tx, room.id, body.check_in, body.check_out).await? {
            return Err(ApiError::Conflict(format!(
                "room {} is not available for those dates",
                room.room_number
            )));
        }
    }

    let nights = (body.check_out - body.check_in).num_days();
    let total_price =
        rooms.iter().map(|r| r.price_per_night).sum::<f64>() * nights as f64;

    let booking_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bookings (user_id, hotel_id, check_in, check_out, status, total_price)
        VALUES (?, ?, ?, ?, 'pending', ?)
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(hotel.id)
    .bind(body.check_in)
    .bind(body.check_out)
    .bind(total_price)
    .fetch_one(&mut *tx)
    .await?;

    for room in &rooms {
        sqlx::query("INSERT INTO booking_rooms (booking_id, room_id) VALUES (?, ?)")
            .bind(booking_id)
            .bind(room.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "id": booking_id,
        "status": "pending",
        "total_price": total_price,
        "message": "Booking successful"
    })))
}

pub async fn get_booking(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let booking = fetch_booking(&state, path.into_inner()).await?;
    authorize_booking_access(&state, &user, &booking).await?;

    let room_ids = booking_room_ids(&state, booking.id).await?;
    Ok(HttpResponse::Ok().json(BookingDetail { booking, room_ids }))
}

/// The caller's own bookings, newest first.
pub async fn list_bookings(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let bookings =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE user_id = ? ORDER BY id DESC")
            .bind(user.id)
            .fetch_all(&state.pool)
            .await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// Admin sees everything; a manager only bookings of hotels they manage.
pub async fn search_bookings(
    state: web::Data<AppState>,
    user: AuthUser,
    params: web::Query<BookingSearch>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin, Role::HotelManager])?;

    let mut query = QueryBuilder::new("SELECT * FROM bookings WHERE 1=1");

    if user.role == Role::HotelManager {
        query.push(" AND hotel_id IN (SELECT id FROM hotels WHERE manager_id = ");
        query.push_bind(user.id);
        query.push(")");
    }
    if let Some(hotel_id) = params.hotel_id {
        query.push(" AND hotel_id = ");
        query.push_bind(hotel_id);
    }
    if let Some(status) = params.status {
        query.push(" AND status = ");
        query.push_bind(status);
    }
    if let (Some(check_in), Some(check_out)) = (params.check_in, params.check_out) {
        validate_range(check_in, check_out)?;
        query.push(" AND check_in < ");
        query.push_bind(check_out);
        query.push(" AND check_out > ");
        query.push_bind(check_in);
    }
    query.push(" ORDER BY id DESC");

    let bookings = query
        .build_query_as::<Booking>()
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(bookings))
}

pub async fn cancel_booking(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let booking = fetch_booking(&state, path.into_inner()).await?;
    if booking.user_id != user.id {
        return Err(ApiError::Forbidden("not your booking".to_string()));
    }
    if booking.status == BookingStatus::Canceled {
        return Err(ApiError::BadRequest(
            "booking is already canceled".to_string(),
        ));
    }

    let today = chrono::Utc::now().naive_utc().date();
    if booking.check_in <= today {
        return Err(ApiError::BadRequest(
            "cannot cancel booking after or on check-in date".to_string(),
        ));
    }

    sqlx::query("UPDATE bookings SET status = 'canceled' WHERE id = ?")
        .bind(booking.id)
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Booking canceled successfully",
        "id": booking.id,
        "refund_amount": booking.total_price
    })))
}

/// Confirmation by the hotel's manager or an admin: pending -> success.
pub async fn set_booking_status(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin, Role::HotelManager])?;

    let booking = fetch_booking(&state, path.into_inner()).await?;
    if user.role == Role::HotelManager {
        let manager_id: i64 = sqlx::query_scalar("SELECT manager_id FROM hotels WHERE id = ?")
            .bind(booking.hotel_id)
            .fetch_one(&state.pool)
            .await?;
        if manager_id != user.id {
            return Err(ApiError::Forbidden(
                "not the manager of this hotel".to_string(),
            ));
        }
    }

    if body.status != BookingStatus::Success || booking.status != BookingStatus::Pending {
        return Err(ApiError::BadRequest(
            "only a pending booking can be confirmed".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = 'success' WHERE id = ? RETURNING *",
    )
    .bind(booking.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_booking(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::Admin])?;
    let booking = fetch_booking(&state, path.into_inner()).await?;

    let mut tx = state.pool.begin().await?;
    sqlx::query("DELETE FROM feedback WHERE booking_id = ?")
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM booking_rooms WHERE booking_id = ?")
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM bookings WHERE id = ?")
        .bind(booking.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "booking deleted",
        "id": booking.id
    })))
}

async fn fetch_booking(state: &AppState, id: i64) -> Result<Booking, ApiError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("booking not found".to_string()))
}

async fn booking_room_ids(state: &AppState, booking_id: i64) -> Result<Vec<i64>, ApiError> {
    let ids = sqlx::query_scalar(
        "SELECT room_id FROM booking_rooms WHERE booking_id = ? ORDER BY room_id",
    )
    .bind(booking_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(ids)
}

async fn authorize_booking_access(
    state: &AppState,
    user: &AuthUser,
    booking: &Booking,
) -> Result<(), ApiError> {
    if booking.user_id == user.id || user.is_admin() {
        return Ok(());
    }
    if user.role == Role::HotelManager {
        let manager_id: i64 = sqlx::query_scalar("SELECT manager_id FROM hotels WHERE id = ?")
            .bind(booking.hotel_id)
            .fetch_one(&state.pool)
            .await?;
        if manager_id == user.id {
            return Ok(());
        }
    }
    Err(ApiError::Forbidden("not your booking".to_string()))
}
