use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::errors::ApiError;
use crate::models::room::{Room, RoomAvailability};

/// Half-open interval overlap: `[a_start, a_end)` intersects `[b_start, b_end)`.
/// A checkout on the same day as the next check-in does not conflict.
pub fn overlaps(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Every endpoint that accepts a date range goes through this.
pub fn validate_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), ApiError> {
    if check_in >= check_out {
        return Err(ApiError::BadRequest(
            "check-out must be after check-in".to_string(),
        ));
    }
    Ok(())
}

/// True when any active booking (pending or success) of this room overlaps
/// the requested range. Runs on the pool or inside a reservation transaction.
pub async fn room_conflicts<'e, E>(
    executor: E,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings b
            JOIN booking_rooms br ON br.booking_id = b.id
            WHERE br.room_id = ?
            AND b.status IN ('pending', 'success')
            AND b.check_in < ?
            AND b.check_out > ?
        )
        "#,
    )
    .bind(room_id)
    .bind(check_out)
    .bind(check_in)
    .fetch_one(executor)
    .await
}

/// All rooms of a hotel with a derived availability flag for the range.
pub async fn rooms_with_availability(
    pool: &SqlitePool,
    hotel_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<RoomAvailability>, sqlx::Error> {
    let rooms = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE hotel_id = ? ORDER BY id")
        .bind(hotel_id)
        .fetch_all(pool)
        .await?;

    let mut out = Vec::with_capacity(rooms.len());
    for room in rooms {
        let conflict = room_conflicts(pool, room.id, check_in, check_out).await?;
        out.push(RoomAvailability {
            room,
            available: !conflict,
        });
    }
    Ok(out)
}
