use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, Error};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use stayhub::{config::Config, AppState};

async fn test_state() -> web::Data<AppState> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 24,
        frontend_url: "http://localhost:3000".to_string(),
        mail_from: "no-reply@stayhub.test".to_string(),
    };
    web::Data::new(AppState::new(pool, config))
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .configure(stayhub::configure),
        )
        .await
    };
}

trait TestApp: Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {}
impl<S> TestApp for S where S: Service<Request, Response = ServiceResponse<BoxBody>, Error = Error> {}

fn session_cookie(resp: &ServiceResponse<BoxBody>) -> Cookie<'static> {
    let raw = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .unwrap();
    Cookie::parse_encoded(raw.to_owned()).unwrap().into_owned()
}

async fn register(app: &impl TestApp, name: &str, email: &str) -> i64 {
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": name, "email": email, "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    body["id"].as_i64().unwrap()
}

async fn login(app: &impl TestApp, email: &str) -> Cookie<'static> {
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": email, "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    session_cookie(&resp)
}

async fn set_role(pool: &SqlitePool, email: &str, role: &str) {
    sqlx::query("UPDATE users SET role = ? WHERE email = ?")
        .bind(role)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
}

/// A verified hotel with one room, plus manager and admin sessions.
async fn setup_hotel(app: &impl TestApp, pool: &SqlitePool) -> (i64, i64, Cookie<'static>) {
    register(app, "Mara", "manager@stayhub.test").await;
    set_role(pool, "manager@stayhub.test", "hotel_manager").await;
    let manager = login(app, "manager@stayhub.test").await;

    let req = test::TestRequest::post()
        .uri("/hotels")
        .cookie(manager.clone())
        .set_json(json!({
            "name": "Seaview",
            "city": "Lisbon",
            "address": "1 Shore Rd",
            "facilities": ["wifi", "pool"],
            "star_rating": 4,
            "hotel_type": "resort"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let hotel: Value = test::read_body_json(resp).await;
    let hotel_id = hotel["id"].as_i64().unwrap();

    register(app, "Ada", "admin@stayhub.test").await;
    set_role(pool, "admin@stayhub.test", "admin").await;
    let admin = login(app, "admin@stayhub.test").await;

    let req = test::TestRequest::put()
        .uri(&format!("/admin/hotels/{hotel_id}/verify"))
        .cookie(admin)
        .set_json(json!({ "decision": "Success" }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/hotels/{hotel_id}/rooms"))
        .cookie(manager.clone())
        .set_json(json!({
            "room_number": "101",
            "room_type": "double",
            "capacity": 2,
            "price_per_night": 90.0
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let room: Value = test::read_body_json(resp).await;

    (hotel_id, room["id"].as_i64().unwrap(), manager)
}

fn days_ahead(days: i64) -> NaiveDate {
    Utc::now().naive_utc().date() + Duration::days(days)
}

fn booking_request(
    cookie: &Cookie<'static>,
    hotel_id: i64,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Request {
    test::TestRequest::post()
        .uri("/bookings")
        .cookie(cookie.clone())
        .set_json(json!({
            "hotel_id": hotel_id,
            "room_ids": [room_id],
            "check_in": check_in,
            "check_out": check_out
        }))
        .to_request()
}

async fn book(
    app: &impl TestApp,
    cookie: &Cookie<'static>,
    hotel_id: i64,
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> ServiceResponse<BoxBody> {
    let req = booking_request(cookie, hotel_id, room_id, check_in, check_out);
    test::call_service(app, req).await
}

#[actix_web::test]
async fn register_login_validate_flow() {
    let state = test_state().await;
    let app = test_app!(state);

    register(&app, "Nia", "nia@stayhub.test").await;

    // the password hash never leaves the server
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "nia@stayhub.test", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp);
    let body: Value = test::read_body_json(resp).await;
    assert!(body.get("password_hash").is_none());

    let req = test::TestRequest::get()
        .uri("/auth/validate")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], "nia@stayhub.test");

    // no cookie, no session
    let req = test::TestRequest::get().uri("/auth/validate").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_email_rejected() {
    let state = test_state().await;
    let app = test_app!(state);

    register(&app, "Nia", "nia@stayhub.test").await;
    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "name": "Other", "email": "nia@stayhub.test", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn email_verification_consumes_token() {
    let state = test_state().await;
    let app = test_app!(state);

    register(&app, "Nia", "nia@stayhub.test").await;
    let token: String =
        sqlx::query_scalar("SELECT verify_token FROM users WHERE email = 'nia@stayhub.test'")
            .fetch_one(&state.pool)
            .await
            .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/users/verify?token={token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let verified: bool =
        sqlx::query_scalar("SELECT verified FROM users WHERE email = 'nia@stayhub.test'")
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert!(verified);

    // token is single-use
    let req = test::TestRequest::get()
        .uri(&format!("/users/verify?token={token}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn booking_requires_auth() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/bookings")
        .set_json(json!({
            "hotel_id": 1,
            "room_ids": [1],
            "check_in": days_ahead(10),
            "check_out": days_ahead(12)
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn booking_nonexistent_hotel_is_bad_request() {
    let state = test_state().await;
    let app = test_app!(state);

    register(&app, "Nia", "nia@stayhub.test").await;
    let cookie = login(&app, "nia@stayhub.test").await;

    let resp = book(&app, &cookie, 999, 1, days_ahead(10), days_ahead(12)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[actix_web::test]
async fn invalid_range_rejected_everywhere() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, _) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let cookie = login(&app, "nia@stayhub.test").await;

    let day = days_ahead(10);
    let resp = book(&app, &cookie, hotel_id, room_id, day, day).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/rooms/{room_id}/availability?check_in={}&check_out={}",
            days_ahead(12),
            days_ahead(10)
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/hotels/{hotel_id}/rooms/availability?check_in={}&check_out={}",
            days_ahead(12),
            days_ahead(10)
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn overlapping_booking_conflicts_back_to_back_does_not() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, _) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let first = login(&app, "nia@stayhub.test").await;
    register(&app, "Ben", "ben@stayhub.test").await;
    let second = login(&app, "ben@stayhub.test").await;

    let resp = book(&app, &first, hotel_id, room_id, days_ahead(10), days_ahead(13)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // overlap with the active booking
    let resp = book(&app, &second, hotel_id, room_id, days_ahead(12), days_ahead(14)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // checkout day equals the next check-in day: no conflict
    let resp = book(&app, &second, hotel_id, room_id, days_ahead(13), days_ahead(15)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/rooms/{room_id}/availability?check_in={}&check_out={}",
            days_ahead(11),
            days_ahead(12)
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["available"], false);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/hotels/{hotel_id}/rooms/availability?check_in={}&check_out={}",
            days_ahead(20),
            days_ahead(22)
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body[0]["available"], true);
}

#[actix_web::test]
async fn concurrent_overlapping_bookings_exactly_one_wins() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, _) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let first = login(&app, "nia@stayhub.test").await;
    register(&app, "Ben", "ben@stayhub.test").await;
    let second = login(&app, "ben@stayhub.test").await;

    let req_a = booking_request(&first, hotel_id, room_id, days_ahead(10), days_ahead(13));
    let req_b = booking_request(&second, hotel_id, room_id, days_ahead(11), days_ahead(14));

    let (resp_a, resp_b) = tokio::join!(
        test::call_service(&app, req_a),
        test::call_service(&app, req_b)
    );

    let mut statuses = [resp_a.status(), resp_b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM bookings WHERE status IN ('pending', 'success')",
    )
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(active, 1);
}

#[actix_web::test]
async fn canceled_booking_frees_the_room() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, _) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let cookie = login(&app, "nia@stayhub.test").await;

    let resp = book(&app, &cookie, hotel_id, room_id, days_ahead(10), days_ahead(13)).await;
    let body: Value = test::read_body_json(resp).await;
    let booking_id = body["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/bookings/{booking_id}/cancel"))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["refund_amount"].as_f64().unwrap(), 270.0);

    register(&app, "Ben", "ben@stayhub.test").await;
    let other = login(&app, "ben@stayhub.test").await;
    let resp = book(&app, &other, hotel_id, room_id, days_ahead(10), days_ahead(13)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn hotel_delete_cascades() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, manager) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let guest = login(&app, "nia@stayhub.test").await;
    let resp = book(&app, &guest, hotel_id, room_id, days_ahead(10), days_ahead(12)).await;
    let body: Value = test::read_body_json(resp).await;
    let booking_id = body["id"].as_i64().unwrap();

    // confirm, then leave feedback so every dependent table has a row
    let req = test::TestRequest::put()
        .uri(&format!("/bookings/{booking_id}/status"))
        .cookie(manager.clone())
        .set_json(json!({ "status": "success" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/feedback")
        .cookie(guest.clone())
        .set_json(json!({ "booking_id": booking_id, "rating": 5, "comment": "great stay" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::delete()
        .uri(&format!("/hotels/{hotel_id}"))
        .cookie(manager)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for table in ["rooms", "bookings", "feedback"] {
        let count: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE hotel_id = ?"))
                .bind(hotel_id)
                .fetch_one(&state.pool)
                .await
                .unwrap();
        assert_eq!(count, 0, "{table} not cascaded");
    }

    let req = test::TestRequest::get()
        .uri(&format!("/hotels/{hotel_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn feedback_gated_on_booking_status() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, room_id, manager) = setup_hotel(&app, &state.pool).await;

    register(&app, "Nia", "nia@stayhub.test").await;
    let guest = login(&app, "nia@stayhub.test").await;
    let resp = book(&app, &guest, hotel_id, room_id, days_ahead(10), days_ahead(12)).await;
    let body: Value = test::read_body_json(resp).await;
    let booking_id = body["id"].as_i64().unwrap();

    // still pending
    let req = test::TestRequest::post()
        .uri("/feedback")
        .cookie(guest.clone())
        .set_json(json!({ "booking_id": booking_id, "rating": 4 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/bookings/{booking_id}/status"))
        .cookie(manager)
        .set_json(json!({ "status": "success" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/feedback")
        .cookie(guest.clone())
        .set_json(json!({ "booking_id": booking_id, "rating": 4, "comment": "nice pool" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // one feedback per booking
    let req = test::TestRequest::post()
        .uri("/feedback")
        .cookie(guest.clone())
        .set_json(json!({ "booking_id": booking_id, "rating": 2 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // the hotel's aggregate follows the feedback
    let req = test::TestRequest::get()
        .uri(&format!("/hotels/{hotel_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rating"].as_f64().unwrap(), 4.0);

    // a canceled booking cannot be reviewed
    let resp = book(&app, &guest, hotel_id, room_id, days_ahead(20), days_ahead(22)).await;
    let body: Value = test::read_body_json(resp).await;
    let canceled_id = body["id"].as_i64().unwrap();
    let req = test::TestRequest::put()
        .uri(&format!("/bookings/{canceled_id}/cancel"))
        .cookie(guest.clone())
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/feedback")
        .cookie(guest)
        .set_json(json!({ "booking_id": canceled_id, "rating": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn role_gates_and_manager_promotion() {
    let state = test_state().await;
    let app = test_app!(state);

    register(&app, "Nia", "nia@stayhub.test").await;
    let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = 'nia@stayhub.test'")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    let cookie = login(&app, "nia@stayhub.test").await;

    // plain users cannot create hotels or list users
    let req = test::TestRequest::post()
        .uri("/hotels")
        .cookie(cookie.clone())
        .set_json(json!({
            "name": "Seaview", "city": "Lisbon", "address": "1 Shore Rd",
            "star_rating": 4, "hotel_type": "resort"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/users")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // request the manager role, approve it as admin
    let req = test::TestRequest::post()
        .uri("/users/manager-request")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    register(&app, "Ada", "admin@stayhub.test").await;
    set_role(&state.pool, "admin@stayhub.test", "admin").await;
    let admin = login(&app, "admin@stayhub.test").await;

    let req = test::TestRequest::get()
        .uri("/admin/manager-requests")
        .cookie(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body[0]["id"].as_i64().unwrap(), user_id);

    let req = test::TestRequest::put()
        .uri(&format!("/admin/manager-requests/{user_id}"))
        .cookie(admin)
        .set_json(json!({ "approve": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["role"], "hotel_manager");

    // a fresh session carries the new role
    let cookie = login(&app, "nia@stayhub.test").await;
    let req = test::TestRequest::post()
        .uri("/hotels")
        .cookie(cookie)
        .set_json(json!({
            "name": "Seaview", "city": "Lisbon", "address": "1 Shore Rd",
            "star_rating": 4, "hotel_type": "resort"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn hotel_search_filters_and_pagination() {
    let state = test_state().await;
    let app = test_app!(state);
    let (hotel_id, _, manager) = setup_hotel(&app, &state.pool).await;

    // a second, unverified hotel never shows up in public search
    let req = test::TestRequest::post()
        .uri("/hotels")
        .cookie(manager)
        .set_json(json!({
            "name": "Hill Lodge", "city": "Porto", "address": "2 Hill St",
            "facilities": ["parking"], "star_rating": 3, "hotel_type": "lodge"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/hotels").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"].as_i64().unwrap(), hotel_id);

    let req = test::TestRequest::get()
        .uri("/hotels?city=Lisb&facility=pool&min_star=4")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/hotels?facility=sauna")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(body.as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/hotels?page=2&per_page=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert!(body.as_array().unwrap().is_empty());
}
