use axum::extract::{Extension, Json, Path, Query};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use super::views;
use crate::entities::reservation::Status;
use crate::error::AppResult;
use crate::services::reservations::{self, ReservationFilter};

#[derive(Debug, Default, serde::Deserialize)]
pub struct ReportQuery {
    search: Option<String>,
    status: Option<String>,
}

/// Unknown status values mean "any status".
fn parse_status(raw: &str) -> Option<Status> {
    match raw.trim().to_lowercase().as_str() {
        "confirmed" => Some(Status::Confirmed),
        "cancelled" => Some(Status::Cancelled),
        _ => None,
    }
}

pub async fn reservation_report(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Value>> {
    let filter = ReservationFilter {
        status: query.status.as_deref().and_then(parse_status),
        search: query.search,
    };

    let list = if filter.search.is_none() && filter.status.is_none() {
        reservations::list_all(&db).await?
    } else {
        reservations::admin_list(&db, filter).await?
    };

    tracing::Span::current()
        .record("table", "reservations")
        .record("action", "reservation_report");

    Ok(Json(json!({
        "total": list.len(),
        "reservations": views::reservations(&list),
    })))
}

pub async fn reservation_detail(
    Extension(db): Extension<DatabaseConnection>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let details = reservations::get(&db, reservation_id).await?;
    Ok(Json(views::reservation(&details)))
}
