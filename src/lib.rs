use actix_web::web;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

pub mod auth;
pub mod availability;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;

use config::Config;

/// Shared application state, built once in `main` (and once per test app).
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    /// Serializes the check-then-insert section of booking creation so that
    /// two overlapping requests cannot both pass the availability check.
    pub reservation: Mutex<()>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Self {
        Self {
            pool,
            config,
            reservation: Mutex::new(()),
        }
    }
}

/// Mounts every route scope. Shared by `main` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(handlers::auth::register))
            .route("/login", web::post().to(handlers::auth::login))
            .route("/logout", web::post().to(handlers::auth::logout))
            .route("/validate", web::get().to(handlers::auth::validate)),
    )
    .service(
        web::scope("/users")
            .route("/verify", web::get().to(handlers::users::verify_email))
            .route("/me", web::get().to(handlers::users::me))
            .route(
                "/manager-request",
                web::post().to(handlers::users::manager_request),
            )
            .route("", web::get().to(handlers::users::list_users))
            .route("/{id}", web::get().to(handlers::users::get_user))
            .route("/{id}", web::put().to(handlers::users::update_user))
            .route("/{id}", web::delete().to(handlers::users::delete_user)),
    )
    .service(
        web::scope("/hotels")
            .route("", web::get().to(handlers::hotels::search_hotels))
            .route("", web::post().to(handlers::hotels::create_hotel))
            .route("/{id}", web::get().to(handlers::hotels::get_hotel))
            .route("/{id}", web::put().to(handlers::hotels::update_hotel))
            .route("/{id}", web::delete().to(handlers::hotels::delete_hotel))
            .route("/{id}/rooms", web::post().to(handlers::rooms::create_room))
            .route("/{id}/rooms", web::get().to(handlers::rooms::list_rooms))
            .route(
                "/{id}/rooms/availability",
                web::get().to(handlers::rooms::hotel_rooms_availability),
            )
            .route(
                "/{id}/feedback",
                web::get().to(handlers::feedback::hotel_feedback),
            ),
    )
    .service(
        web::scope("/rooms")
            .route("/{id}", web::get().to(handlers::rooms::get_room))
            .route("/{id}", web::put().to(handlers::rooms::update_room))
            .route("/{id}", web::delete().to(handlers::rooms::delete_room))
            .route(
                "/{id}/availability",
                web::get().to(handlers::rooms::room_availability),
            ),
    )
    .service(
        web::scope("/bookings")
            .route("", web::post().to(handlers::bookings::create_booking))
            .route("", web::get().to(handlers::bookings::list_bookings))
            .route("/search", web::get().to(handlers::bookings::search_bookings))
            .route("/{id}", web::get().to(handlers::bookings::get_booking))
            .route("/{id}", web::delete().to(handlers::bookings::delete_booking))
            .route("/{id}/cancel", web::put().to(handlers::bookings::cancel_booking))
            .route(
                "/{id}/status",
                web::put().to(handlers::bookings::set_booking_status),
            ),
    )
    .service(
        web::scope("/feedback")
            .route("", web::post().to(handlers::feedback::create_feedback))
            .route("/{id}", web::put().to(handlers::feedback::update_feedback))
            .route("/{id}", web::delete().to(handlers::feedback::delete_feedback)),
    )
    .service(
        web::scope("/admin")
            .route("/hotels/pending", web::get().to(handlers::admin::pending_hotels))
            .route(
                "/hotels/{id}/verify",
                web::put().to(handlers::admin::verify_hotel),
            )
            .route(
                "/manager-requests",
                web::get().to(handlers::admin::manager_requests),
            )
            .route(
                "/manager-requests/{id}",
                web::put().to(handlers::admin::decide_manager_request),
            ),
    );
}
