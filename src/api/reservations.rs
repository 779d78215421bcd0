use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use super::{middleware::CurrentUser, views};
use crate::entities::reservation::Status;
use crate::error::AppResult;
use crate::services::reservations::{self, NewReservation};

pub async fn create_reservation(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<NewReservation>,
) -> AppResult<Response> {
    let created = reservations::create(&db, current.id, payload).await?;

    tracing::Span::current()
        .record("table", "reservations")
        .record("action", "create_reservation")
        .record("business_event", "Reservation created");
    crate::metrics::record_reservation_created(created.passenger_count);

    let details = reservations::get(&db, created.id).await?;
    Ok((StatusCode::CREATED, Json(views::reservation(&details))).into_response())
}

pub async fn get_reservation(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let details = reservations::get(&db, reservation_id).await?;
    current.ensure_can_access(details.reservation.user_id)?;
    Ok(Json(views::reservation(&details)))
}

#[derive(serde::Deserialize)]
pub struct UpdateReservationRequest {
    status: Status,
}

pub async fn update_reservation(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i32>,
    Json(payload): Json<UpdateReservationRequest>,
) -> AppResult<Json<Value>> {
    let existing = reservations::find(&db, reservation_id).await?;
    current.ensure_can_access(existing.user_id)?;

    let updated = reservations::update_status(&db, reservation_id, payload.status).await?;
    if updated.status != existing.status {
        crate::metrics::record_reservation_status(updated.status);
    }

    tracing::Span::current()
        .record("table", "reservations")
        .record("action", "update_reservation_status")
        .record("business_event", "Reservation status updated");

    let details = reservations::get(&db, reservation_id).await?;
    Ok(Json(views::reservation(&details)))
}

pub async fn delete_reservation(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let existing = reservations::find(&db, reservation_id).await?;
    current.ensure_can_access(existing.user_id)?;

    reservations::delete(&db, reservation_id).await?;

    tracing::Span::current()
        .record("table", "reservations")
        .record("action", "delete_reservation")
        .record("business_event", "Reservation deleted");
    crate::metrics::record_reservation_deleted(existing.status == Status::Confirmed);

    Ok(Json(json!({"message": "Reservation deleted"})))
}

pub async fn list_user_reservations(
    Extension(db): Extension<DatabaseConnection>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Value>> {
    current.ensure_can_access(user_id)?;
    let list = reservations::list_for_user(&db, user_id).await?;
    Ok(Json(views::reservations(&list)))
}
