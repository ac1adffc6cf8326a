use actix_web::{web, HttpResponse};
use sqlx::types::Json;
use sqlx::QueryBuilder;
use validator::Validate;

use crate::auth::extractor::AuthUser;
use crate::errors::ApiError;
use crate::models::hotel::{CreateHotel, Hotel, HotelSearch, UpdateHotel};
use crate::models::user::Role;
use crate::AppState;

pub async fn create_hotel(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreateHotel>,
) -> Result<HttpResponse, ApiError> {
    user.require_role(&[Role::HotelManager])?;
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let hotel = sqlx::query_as::<_, Hotel>(
        r#"
        INSERT INTO hotels (manager_id, name, city, address, description, facilities, star_rating, hotel_type)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&body.name)
    .bind(&body.city)
    .bind(&body.address)
    .bind(&body.description)
    .bind(Json(&body.facilities))
    .bind(body.star_rating)
    .bind(&body.hotel_type)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Created().json(hotel))
}

/// Public search over verified hotels. Filters build up incrementally,
/// all values bound as parameters.
pub async fn search_hotels(
    state: web::Data<AppState>,
    params: web::Query<HotelSearch>,
) -> Result<HttpResponse, ApiError> {
    let mut query =
        QueryBuilder::new("SELECT * FROM hotels WHERE verification_status = 'Success'");

    if let Some(city) = &params.city {
        query.push(" AND city LIKE ");
        query.push_bind(format!("%{city}%"));
    }
    if let Some(facility) = &params.facility {
        // facilities is a JSON array of strings; match the quoted element
        query.push(" AND facilities LIKE ");
        query.push_bind(format!("%\"{facility}\"%"));
    }
    if let Some(min_star) = params.min_star {
        query.push(" AND star_rating >= ");
        query.push_bind(min_star);
    }
    if let Some(hotel_type) = &params.hotel_type {
        query.push(" AND hotel_type = ");
        query.push_bind(hotel_type);
    }

    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);
    query.push(" ORDER BY id LIMIT ");
    query.push_bind(per_page);
    query.push(" OFFSET ");
    query.push_bind((page - 1) * per_page);

    let hotels = query
        .build_query_as::<Hotel>()
        .fetch_all(&state.pool)
        .await?;

    Ok(HttpResponse::Ok().json(hotels))
}

pub async fn get_hotel(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let hotel = fetch_hotel(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(hotel))
}

pub async fn update_hotel(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    body: web::Json<UpdateHotel>,
) -> Result<HttpResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let hotel = fetch_hotel(&state, path.into_inner()).await?;
    require_owner_or_admin(&user, &hotel)?;

    let facilities = body
        .facilities
        .clone()
        .map(Json)
        .unwrap_or(hotel.facilities);

    let updated = sqlx::query_as::<_, Hotel>(
        r#"
        UPDATE hotels
        SET name = ?, city = ?, address = ?, description = ?, facilities = ?, star_rating = ?, hotel_type = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(body.name.clone().unwrap_or(hotel.name))
    .bind(body.city.clone().unwrap_or(hotel.city))
    .bind(body.address.clone().unwrap_or(hotel.address))
    .bind(body.description.clone().unwrap_or(hotel.description))
    .bind(facilities)
    .bind(body.star_rating.unwrap_or(hotel.star_rating))
    .bind(body.hotel_type.clone().unwrap_or(hotel.hotel_type))
    .bind(hotel.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Cascade delete: feedback, booking room links, bookings, rooms, then the
/// hotel itself, in one transaction.
pub async fn delete_hotel(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let hotel = fetch_hotel(&state, path.into_inner()).await?;
    require_owner_or_admin(&user, &hotel)?;

    let mut tx = state.pool.begin().await?;

    sqlx::query("DELETE FROM feedback WHERE hotel_id = ?")
        .bind(hotel.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "DELETE FROM booking_rooms WHERE booking_id IN (SELECT id FROM bookings WHERE hotel_id = ?)",
    )
    .bind(hotel.id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM bookings WHERE hotel_id = ?")
        .bind(hotel.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE hotel_id = ?")
        .bind(hotel.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM hotels WHERE id = ?")
        .bind(hotel.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!("hotel {} deleted with its rooms, bookings and feedback", hotel.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "hotel deleted",
        "id": hotel.id
    })))
}

pub(crate) async fn fetch_hotel(state: &AppState, id: i64) -> Result<Hotel, ApiError> {
    sqlx::query_as::<_, Hotel>("SELECT * FROM hotels WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("hotel not found".to_string()))
}

pub(crate) fn require_owner_or_admin(user: &AuthUser, hotel: &Hotel) -> Result<(), ApiError> {
    if user.is_admin() || (user.role == Role::HotelManager && hotel.manager_id == user.id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "not the manager of this hotel".to_string(),
        ))
    }
}
