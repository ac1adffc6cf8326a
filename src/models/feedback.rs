use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub user_id: i64,
    pub hotel_id: i64,
    pub booking_id: i64,
    pub rating: i64,
    pub comment: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedback {
    pub booking_id: i64,
    #[validate(range(min = 1, max = 5))]
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFeedback {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i64>,
    pub comment: Option<String>,
}
