use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use super::views;
use crate::error::AppResult;
use crate::services::catalog::{self, DestinationChanges, NewDestination};

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub featured: bool,
}

pub async fn list_destinations(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let destinations = if query.featured {
        catalog::featured_destinations(&db).await?
    } else {
        catalog::list_destinations(&db).await?
    };
    Ok(Json(destinations.iter().map(views::destination).collect()))
}

pub async fn get_destination(
    Extension(db): Extension<DatabaseConnection>,
    Path(destination_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let destination = catalog::get_destination(&db, destination_id).await?;
    let packages = catalog::destination_packages(&db, &destination).await?;

    let mut body = views::destination(&destination);
    body["packages"] = packages.iter().map(views::package).collect();
    Ok(Json(body))
}

pub async fn create_destination(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<NewDestination>,
) -> AppResult<Response> {
    let destination = catalog::create_destination(&db, payload).await?;

    tracing::Span::current()
        .record("table", "destinations")
        .record("action", "create_destination")
        .record("business_event", "Destination created");
    crate::metrics::adjust_catalog_gauge("destinations", 1.0);

    Ok((StatusCode::CREATED, Json(views::destination(&destination))).into_response())
}

pub async fn update_destination(
    Extension(db): Extension<DatabaseConnection>,
    Path(destination_id): Path<i32>,
    Json(payload): Json<DestinationChanges>,
) -> AppResult<Json<Value>> {
    let destination = catalog::update_destination(&db, destination_id, payload).await?;

    tracing::Span::current()
        .record("table", "destinations")
        .record("action", "update_destination");

    Ok(Json(views::destination(&destination)))
}

pub async fn delete_destination(
    Extension(db): Extension<DatabaseConnection>,
    Path(destination_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let name = catalog::delete_destination(&db, destination_id).await?;

    tracing::Span::current()
        .record("table", "destinations")
        .record("action", "delete_destination")
        .record("business_event", "Destination deleted");
    crate::metrics::adjust_catalog_gauge("destinations", -1.0);

    Ok(Json(json!({ "message": format!("Destination \"{name}\" deleted") })))
}
