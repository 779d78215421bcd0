use axum::extract::{Extension, Json};
use sea_orm::DatabaseConnection;
use serde_json::Value;

use super::{middleware::CurrentUser, session::Session, views};
use crate::entities::user;
use crate::error::AppResult;
use crate::services::{
    accounts::{self, ProfileUpdate},
    reservations,
};

pub async fn get_profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<user::Model>> {
    Ok(Json(accounts::find(&db, current.id).await?))
}

pub async fn update_profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<user::Model>> {
    let today = chrono::Local::now().date_naive();
    let user = accounts::update_profile(&db, current.id, payload, today).await?;

    session.update(|data| data.user_name = Some(user.full_name.clone()));

    tracing::Span::current()
        .record("table", "users")
        .record("action", "update_profile")
        .record("business_event", "Profile updated");

    Ok(Json(user))
}

pub async fn my_reservations(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Value>> {
    let list = reservations::list_for_user(&db, current.id).await?;
    Ok(Json(views::reservations(&list)))
}
