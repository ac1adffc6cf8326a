use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;

use stayhub::{config::Config, db, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger and environment
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();

    log::info!("Connecting to database...");
    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to create pool");

    // Run migrations
    log::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting server at http://{bind_addr}");

    let state = web::Data::new(AppState::new(pool, config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(stayhub::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
