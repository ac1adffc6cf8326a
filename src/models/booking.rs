use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Success,
    Canceled,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub hotel_id: i64,
    pub check_in: chrono::NaiveDate,
    pub check_out: chrono::NaiveDate,
    pub status: BookingStatus,
    pub total_price: f64,
    pub created_at: chrono::NaiveDateTime,
}

/// A booking together with the rooms it reserves.
#[derive(Debug, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub room_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBooking {
    pub hotel_id: i64,
    #[validate(length(min = 1))]
    pub room_ids: Vec<i64>,
    pub check_in: chrono::NaiveDate,
    pub check_out: chrono::NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct BookingSearch {
    pub hotel_id: Option<i64>,
    pub status: Option<BookingStatus>,
    pub check_in: Option<chrono::NaiveDate>,
    pub check_out: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}
