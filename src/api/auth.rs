use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::session::Session;
use crate::error::AppResult;
use crate::services::accounts::{self, Registration};

pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<Registration>,
) -> AppResult<Response> {
    let today = chrono::Local::now().date_naive();
    let user = match accounts::register(&db, payload, today).await {
        Ok(user) => user,
        Err(e) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "register_user_failed");
            return Err(e);
        }
    };

    tracing::Span::current()
        .record("table", "users")
        .record("action", "register_user")
        .record("user_id", user.id)
        .record("business_event", "User registered successfully");

    crate::metrics::record_user_registered();

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    Extension(session): Extension<Session>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Response> {
    let user = match accounts::authenticate(&db, &payload.email, &payload.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "login_user_failed")
                .record("error", "invalid_credentials");
            return Err(e);
        }
    };

    // The cart carries over to the new session id.
    session.regenerate();
    session.update(|data| {
        data.user_id = Some(user.id);
        data.user_name = Some(user.full_name.clone());
        data.role = Some(user.role);
    });

    tracing::Span::current()
        .record("table", "users")
        .record("action", "login_user")
        .record("user_id", user.id)
        .record("business_event", "User logged in successfully");

    Ok((
        StatusCode::OK,
        Json(json!({"message": "Login successful", "user": user})),
    )
        .into_response())
}

pub async fn logout(Extension(session): Extension<Session>) -> Response {
    if let Some(user_id) = session.user_id() {
        tracing::Span::current()
            .record("action", "logout_user")
            .record("user_id", user_id);
    }
    session.destroy();
    (StatusCode::OK, Json(json!({"message": "Logged out"}))).into_response()
}
