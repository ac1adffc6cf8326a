use std::{env, fmt::Display, str::FromStr};

/// Runtime configuration, read once at startup from the environment
/// (`.env` is loaded by `main` before this runs).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub frontend_url: String,
    pub mail_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: required("DATABASE_URL"),
            bind_addr: try_load("BIND_ADDR", "127.0.0.1:8080"),
            jwt_secret: required("JWT_SECRET"),
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "24"),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:3000"),
            mail_from: try_load("MAIL_FROM", "no-reply@stayhub.local"),
        }
    }
}

fn required(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("invalid {key} value: {e}"))
}
