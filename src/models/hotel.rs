use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum VerificationStatus {
    Pending,
    Success,
    Fail,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Hotel {
    pub id: i64,
    pub manager_id: i64,
    pub name: String,
    pub city: String,
    pub address: String,
    pub description: String,
    pub facilities: Json<Vec<String>>,
    pub star_rating: i64,
    pub hotel_type: String,
    /// Aggregate of feedback ratings, recomputed on every feedback write.
    pub rating: f64,
    pub verification_status: VerificationStatus,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateHotel {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[validate(range(min = 1, max = 5))]
    pub star_rating: i64,
    #[validate(length(min = 1))]
    pub hotel_type: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateHotel {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    pub description: Option<String>,
    pub facilities: Option<Vec<String>>,
    #[validate(range(min = 1, max = 5))]
    pub star_rating: Option<i64>,
    pub hotel_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HotelSearch {
    pub city: Option<String>,
    pub facility: Option<String>,
    pub min_star: Option<i64>,
    pub hotel_type: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
