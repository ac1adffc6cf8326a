use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Availability is derived from active bookings, never stored on the room.
#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct Room {
    pub id: i64,
    pub hotel_id: i64,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i64,
    pub price_per_night: f64,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct RoomAvailability {
    #[serde(flatten)]
    pub room: Room,
    pub available: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoom {
    #[validate(length(min = 1))]
    pub room_number: String,
    #[validate(length(min = 1))]
    pub room_type: String,
    #[validate(range(min = 1))]
    pub capacity: i64,
    #[validate(range(min = 0.0))]
    pub price_per_night: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoom {
    pub room_number: Option<String>,
    pub room_type: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i64>,
    #[validate(range(min = 0.0))]
    pub price_per_night: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: chrono::NaiveDate,
    pub check_out: chrono::NaiveDate,
}
