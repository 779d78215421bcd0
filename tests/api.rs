mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::*;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use travelbook_server::{
    api::{self, session::SessionStore},
    entities::user::Role,
};

struct Reply {
    status: StatusCode,
    session_cookie: Option<String>,
    body: Value,
}

fn app(db: &DatabaseConnection) -> Router {
    api::router(db.clone(), SessionStore::new(db.clone(), 7))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let session_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(api::session::COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    Reply {
        status,
        session_cookie,
        body,
    }
}

async fn login(app: &Router, email: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": email, "password": "secret123"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    reply.session_cookie.expect("login sets the session cookie")
}

#[tokio::test]
async fn health_is_public() {
    let db = setup_db().await;
    let reply = send(&app(&db), Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn register_login_profile_logout() {
    let db = setup_db().await;
    let app = app(&db);

    let reply = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "full_name": "Ana Rojas",
            "national_id": rut_for(11111111),
            "email": "ana@example.cl",
            "password": "secret123",
            "confirm_password": "secret123",
            "birth_date": "1990-05-17",
            "phone": "+56912345678",
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["role"], "client");
    assert!(reply.body.get("password_hash").is_none());

    let cookie = login(&app, "ana@example.cl").await;

    let profile = send(&app, Method::GET, "/auth/profile", Some(&cookie), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["email"], "ana@example.cl");

    let logout = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = send(&app, Method::GET, "/auth/profile", Some(&cookie), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;

    let reply = send(
        &app(&db),
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "ana@example.cl", "password": "nope"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Invalid email or password");
    assert!(reply.session_cookie.is_none());
}

#[tokio::test]
async fn catalog_writes_need_an_admin() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;
    create_admin(&db, "boss@example.cl", 22222222).await;
    let app = app(&db);
    let body = json!({"name": "Elqui", "base_cost": 80.0, "activities": "stars, pisco"});

    let anonymous = send(&app, Method::POST, "/api/destinations", None, Some(body.clone())).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let client = login(&app, "ana@example.cl").await;
    let forbidden = send(
        &app,
        Method::POST,
        "/api/destinations",
        Some(&client),
        Some(body.clone()),
    )
    .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let admin = login(&app, "boss@example.cl").await;
    let created = send(&app, Method::POST, "/api/destinations", Some(&admin), Some(body)).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["activities"], json!(["stars", "pisco"]));

    // Reads stay public.
    let list = send(&app, Method::GET, "/api/destinations", None, None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn reservations_are_private_to_their_owner() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;
    create_user(&db, "luis@example.cl", 22222222).await;
    create_admin(&db, "boss@example.cl", 33333333).await;
    let package = create_package(&db, "Patagonia", 5, vec![]).await;
    let app = app(&db);

    let anonymous = send(
        &app,
        Method::POST,
        "/api/reservations",
        None,
        Some(json!({"package_id": package.id})),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let ana = login(&app, "ana@example.cl").await;
    let created = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&ana),
        Some(json!({"package_id": package.id, "passenger_count": 2})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.body["status"], "confirmed");
    assert_eq!(created.body["package"]["available_seats"], 3);
    let id = created.body["id"].as_i64().unwrap();

    let luis = login(&app, "luis@example.cl").await;
    let peek = send(
        &app,
        Method::GET,
        &format!("/api/reservations/{id}"),
        Some(&luis),
        None,
    )
    .await;
    assert_eq!(peek.status, StatusCode::FORBIDDEN);

    let cancel = send(
        &app,
        Method::PUT,
        &format!("/api/reservations/{id}"),
        Some(&ana),
        Some(json!({"status": "cancelled"})),
    )
    .await;
    assert_eq!(cancel.status, StatusCode::OK);
    assert_eq!(cancel.body["package"]["available_seats"], 5);

    let admin = login(&app, "boss@example.cl").await;
    let report = send(
        &app,
        Method::GET,
        "/admin/reservations?status=cancelled&search=",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(report.status, StatusCode::OK);
    assert_eq!(report.body["total"], 1);

    let not_admin = send(&app, Method::GET, "/admin/reservations", Some(&ana), None).await;
    assert_eq!(not_admin.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cart_respects_availability_and_checks_out() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;
    let package = create_package(&db, "Chiloe", 3, vec![]).await;
    let app = app(&db);

    // Anonymous visitors can fill a cart; login keeps it.
    let added = send(
        &app,
        Method::POST,
        "/api/cart/add",
        None,
        Some(json!({"package_id": package.id, "quantity": 2})),
    )
    .await;
    assert_eq!(added.status, StatusCode::OK, "{}", added.body);
    assert_eq!(added.body["count"], 2);
    let cookie = added.session_cookie.expect("cart creates a session");

    let too_many = send(
        &app,
        Method::POST,
        "/api/cart/add",
        Some(&cookie),
        Some(json!({"package_id": package.id, "quantity": 2})),
    )
    .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let view = send(&app, Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(view.body["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(view.body["total"], 2400.0);

    let anonymous_checkout = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&cookie),
        Some(json!({})),
    )
    .await;
    assert_eq!(anonymous_checkout.status, StatusCode::UNAUTHORIZED);

    let login_reply = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(&cookie),
        Some(json!({"email": "ana@example.cl", "password": "secret123"})),
    )
    .await;
    assert_eq!(login_reply.status, StatusCode::OK);
    let cookie = login_reply.session_cookie.expect("login issues a new session id");

    let checkout = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&cookie),
        Some(json!({"contact_phone": "+56911112222"})),
    )
    .await;
    assert_eq!(checkout.status, StatusCode::OK, "{}", checkout.body);
    assert_eq!(checkout.body["created"].as_array().map(Vec::len), Some(1));
    assert_eq!(checkout.body["failed"], json!([]));
    assert_eq!(checkout.body["count"], 0);
    assert_eq!(seats_left(&db, package.id).await, 1);

    let count = send(&app, Method::GET, "/api/cart/count", Some(&cookie), None).await;
    assert_eq!(count.body["count"], 0);
}

#[tokio::test]
async fn admins_cannot_use_the_cart() {
    let db = setup_db().await;
    create_admin(&db, "boss@example.cl", 11111111).await;
    let package = create_package(&db, "Pucon", 5, vec![]).await;
    let app = app(&db);
    let admin = login(&app, "boss@example.cl").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/cart/add",
        Some(&admin),
        Some(json!({"package_id": package.id})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_cart_lines_and_packages_are_not_found() {
    let db = setup_db().await;
    let app = app(&db);

    let missing_package = send(
        &app,
        Method::POST,
        "/api/cart/add",
        None,
        Some(json!({"package_id": 404})),
    )
    .await;
    assert_eq!(missing_package.status, StatusCode::NOT_FOUND);

    let missing_line = send(
        &app,
        Method::POST,
        "/api/cart/remove",
        None,
        Some(json!({"token": uuid::Uuid::new_v4()})),
    )
    .await;
    assert_eq!(missing_line.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_rotates_the_session_id() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;
    let package = create_package(&db, "Elqui", 5, vec![]).await;
    let app = app(&db);

    let added = send(
        &app,
        Method::POST,
        "/api/cart/add",
        None,
        Some(json!({"package_id": package.id})),
    )
    .await;
    let before = added.session_cookie.expect("cart creates a session");

    let login_reply = send(
        &app,
        Method::POST,
        "/auth/login",
        Some(&before),
        Some(json!({"email": "ana@example.cl", "password": "secret123"})),
    )
    .await;
    assert_eq!(login_reply.status, StatusCode::OK);
    let after = login_reply.session_cookie.expect("login sets the session cookie");
    assert_ne!(before, after);

    let stale = send(&app, Method::GET, "/auth/profile", Some(&before), None).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    let profile = send(&app, Method::GET, "/auth/profile", Some(&after), None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["email"], "ana@example.cl");

    let count = send(&app, Method::GET, "/api/cart/count", Some(&after), None).await;
    assert_eq!(count.body["count"], 1);
}

#[tokio::test]
async fn failed_checkout_lines_stay_in_the_cart() {
    let db = setup_db().await;
    create_user(&db, "ana@example.cl", 11111111).await;
    create_admin(&db, "boss@example.cl", 22222222).await;
    let roomy = create_package(&db, "Roomy", 5, vec![]).await;
    let tight = create_package(&db, "Tight", 3, vec![]).await;
    let app = app(&db);

    let ana = login(&app, "ana@example.cl").await;
    for (package_id, quantity) in [(roomy.id, 1), (tight.id, 3)] {
        let added = send(
            &app,
            Method::POST,
            "/api/cart/add",
            Some(&ana),
            Some(json!({"package_id": package_id, "quantity": quantity})),
        )
        .await;
        assert_eq!(added.status, StatusCode::OK, "{}", added.body);
    }

    let admin = login(&app, "boss@example.cl").await;
    let cut = send(
        &app,
        Method::PUT,
        &format!("/api/packages/{}", tight.id),
        Some(&admin),
        Some(json!({"available_seats": 1})),
    )
    .await;
    assert_eq!(cut.status, StatusCode::OK, "{}", cut.body);

    let checkout = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&ana),
        Some(json!({})),
    )
    .await;
    assert_eq!(checkout.status, StatusCode::OK, "{}", checkout.body);
    assert_eq!(checkout.body["created"].as_array().map(Vec::len), Some(1));
    let failed = checkout.body["failed"].as_array().cloned().unwrap_or_default();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["package_id"], tight.id);
    assert_eq!(failed[0]["quantity"], 3);
    assert_eq!(checkout.body["count"], 3);

    assert_eq!(seats_left(&db, roomy.id).await, 4);
    assert_eq!(seats_left(&db, tight.id).await, 1);

    let view = send(&app, Method::GET, "/api/cart", Some(&ana), None).await;
    let items = view.body["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["package"]["id"], tight.id);
}

#[tokio::test]
async fn cart_view_drops_deleted_packages() {
    let db = setup_db().await;
    create_admin(&db, "boss@example.cl", 11111111).await;
    let kept = create_package(&db, "Kept", 5, vec![]).await;
    let doomed = create_package(&db, "Doomed", 5, vec![]).await;
    let app = app(&db);

    let mut cookie = None;
    for package_id in [kept.id, doomed.id] {
        let added = send(
            &app,
            Method::POST,
            "/api/cart/add",
            cookie.as_deref(),
            Some(json!({"package_id": package_id, "quantity": 2})),
        )
        .await;
        assert_eq!(added.status, StatusCode::OK, "{}", added.body);
        cookie = cookie.or(added.session_cookie);
    }
    let cookie = cookie.expect("cart creates a session");

    let admin = login(&app, "boss@example.cl").await;
    let deleted = send(
        &app,
        Method::DELETE,
        &format!("/api/packages/{}", doomed.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK, "{}", deleted.body);

    let view = send(&app, Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(view.status, StatusCode::OK);
    let items = view.body["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["package"]["id"], kept.id);
    assert_eq!(view.body["count"], 2);
    assert_eq!(view.body["total"], 2400.0);

    let count = send(&app, Method::GET, "/api/cart/count", Some(&cookie), None).await;
    assert_eq!(count.body["count"], 2);
}

#[tokio::test]
async fn demoted_admin_loses_access_on_the_next_request() {
    let db = setup_db().await;
    let ana = create_user(&db, "ana@example.cl", 11111111).await;
    let boss = create_admin(&db, "boss@example.cl", 22222222).await;
    let package = create_package(&db, "Pucon", 5, vec![]).await;
    let app = app(&db);

    let ana_cookie = login(&app, "ana@example.cl").await;
    let created = send(
        &app,
        Method::POST,
        "/api/reservations",
        Some(&ana_cookie),
        Some(json!({"package_id": package.id})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let uri = format!("/api/reservations/{}", created.body["id"]);

    let admin = login(&app, "boss@example.cl").await;
    let seen = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(seen.status, StatusCode::OK);

    let mut demoted = boss.into_active_model();
    demoted.role = Set(Role::Client);
    demoted.update(&db).await.unwrap();

    let reservation = send(&app, Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(reservation.status, StatusCode::FORBIDDEN);
    let report = send(&app, Method::GET, "/admin/reservations", Some(&admin), None).await;
    assert_eq!(report.status, StatusCode::FORBIDDEN);

    let own = send(
        &app,
        Method::GET,
        &format!("/api/reservations/user/{}", ana.id),
        Some(&ana_cookie),
        None,
    )
    .await;
    assert_eq!(own.status, StatusCode::OK);
}
