use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::availability::{room_conflicts, rooms_with_availability, validate_range};
use crate::errors::ApiError;
use crate::handlers::hotels::{fetch_hotel, require_owner_or_admin};
use crate::models::room::{AvailabilityQuery, CreateRoom, Room, UpdateRoom};
use crate::AppState;

pub async fn create_room(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<CreateRoom>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let hotel = fetch_hotel(&state, path.into_inner()).await?;
    require_owner_or_admin(&user, &hotel)?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO rooms (hotel_id, room_number, room_type, capacity, price_per_night)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(hotel.id)
    .bind(&body.room_number)
    .bind(&body.room_type)
    .bind(body.capacity)
    .bind(body.price_per_night)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Created().json(room))
}

pub async fn list_rooms(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let hotel = fetch_hotel(&state, path.into_inner()).await?;
    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE hotel_id = ? ORDER BY id")
        .bind(hotel.id)
        .fetch_all(&state.pool)
        .await?;
    Ok(HttpResponse::Ok().json(rooms))
}

pub async fn get_room(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let room = fetch_room(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(room))
}

pub async fn update_room(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateRoom>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let room = fetch_room(&state, path.into_inner()).await?;
    let hotel = fetch_hotel(&state, room.hotel_id).await?;
    require_owner_or_admin(&user, &hotel)?;

    let updated = sqlx::query_as::<_, Room>(
        r#"
        UPDATE rooms
        SET room_number = ?, room_type = ?, capacity = ?, price_per_night = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(body.room_number.clone().unwrap_or(room.room_number))
    .bind(body.room_type.clone().unwrap_or(room.room_type))
    .bind(body.capacity.unwrap_or(room.capacity))
    .bind(body.price_per_night.unwrap_or(room.price_per_night))
    .bind(room.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

pub async fn delete_room(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let room = fetch_room(&state, path.into_inner()).await?;
    let hotel = fetch_hotel(&state, room.hotel_id).await?;
    require_owner_or_admin(&user, &hotel)?;

    // Bookings keep their history; a referenced room cannot be removed.
    let referenced: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM booking_rooms WHERE room_id = ?)")
            .bind(room.id)
            .fetch_one(&state.pool)
            .await?;
    if referenced {
        return Err(ApiError::Conflict(
            "room has bookings and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM rooms WHERE id = ?")
        .bind(room.id)
        .execute(&state.pool)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "room deleted", "id": room.id })))
}

pub async fn room_availability(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, ApiError> {
    validate_range(query.check_in, query.check_out)?;
    let room = fetch_room(&state, path.into_inner()).await?;

    let conflict = room_conflicts(&state.pool, room.id, query.check_in, query.check_out).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "available": !conflict })))
}

pub async fn hotel_rooms_availability(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, ApiError> {
    validate_range(query.check_in, query.check_out)?;
    let hotel = fetch_hotel(&state, path.into_inner()).await?;

    let rooms =
        rooms_with_availability(&state.pool, hotel.id, query.check_in, query.check_out).await?;
    Ok(HttpResponse::Ok().json(rooms))
}

async fn fetch_room(state: &AppState, id: i64) -> Result<Room, ApiError> {
    sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("room not found".to_string()))
}
