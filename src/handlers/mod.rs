pub mod admin;
pub mod auth;
pub mod bookings;
pub mod feedback;
pub mod hotels;
pub mod rooms;
pub mod users;
