use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use super::{destinations::ListQuery, views};
use crate::error::AppResult;
use crate::services::catalog::{self, NewPackage, PackageChanges, PackageSearch};

pub async fn list_packages(
    Extension(db): Extension<DatabaseConnection>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let packages = if query.featured {
        catalog::featured_packages(&db, chrono::Local::now().date_naive()).await?
    } else {
        catalog::list_packages(&db).await?
    };
    Ok(Json(
        packages.iter().map(views::package_with_destinations).collect(),
    ))
}

pub async fn get_package(
    Extension(db): Extension<DatabaseConnection>,
    Path(package_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let package = catalog::get_package(&db, package_id).await?;
    Ok(Json(views::package_with_destinations(&package)))
}

pub async fn search_packages(
    Extension(db): Extension<DatabaseConnection>,
    Query(search): Query<PackageSearch>,
) -> AppResult<Json<Value>> {
    let packages = catalog::search_packages(&db, search).await?;
    Ok(Json(
        packages.iter().map(views::package_with_destinations).collect(),
    ))
}

pub async fn create_package(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<NewPackage>,
) -> AppResult<Response> {
    let package = catalog::create_package(&db, payload).await?;

    tracing::Span::current()
        .record("table", "packages")
        .record("action", "create_package")
        .record("business_event", "Package created");
    crate::metrics::adjust_catalog_gauge("packages", 1.0);

    Ok((
        StatusCode::CREATED,
        Json(views::package_with_destinations(&package)),
    )
        .into_response())
}

pub async fn update_package(
    Extension(db): Extension<DatabaseConnection>,
    Path(package_id): Path<i32>,
    Json(payload): Json<PackageChanges>,
) -> AppResult<Json<Value>> {
    let package = catalog::update_package(&db, package_id, payload).await?;

    tracing::Span::current()
        .record("table", "packages")
        .record("action", "update_package");

    Ok(Json(views::package_with_destinations(&package)))
}

pub async fn delete_package(
    Extension(db): Extension<DatabaseConnection>,
    Path(package_id): Path<i32>,
) -> AppResult<Json<Value>> {
    let name = catalog::delete_package(&db, package_id).await?;

    tracing::Span::current()
        .record("table", "packages")
        .record("action", "delete_package")
        .record("business_event", "Package deleted");
    crate::metrics::adjust_catalog_gauge("packages", -1.0);

    Ok(Json(json!({ "message": format!("Package \"{name}\" deleted") })))
}
