//! Destination and package management.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, LoaderTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

use super::{check_len, contains_ci, non_blank};
use crate::entities::{
    destination, package, package_destination, reservation, traveler, Destination, Package,
    PackageDestination, Reservation, Traveler,
};
use crate::error::{AppError, AppResult};

pub const FEATURED_LIMIT: u64 = 6;

pub type PackageWithDestinations = (package::Model, Vec<destination::Model>);

/// Activities arrive either as a JSON list or as one comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Activities {
    List(Vec<String>),
    Text(String),
}

impl Activities {
    fn joined(self) -> Option<String> {
        let items: Vec<String> = match self {
            Activities::List(items) => items,
            Activities::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        let joined = items
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        (!joined.is_empty()).then_some(joined)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewDestination {
    pub name: String,
    pub origin: Option<String>,
    pub description: Option<String>,
    pub activities: Option<Activities>,
    pub base_cost: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DestinationChanges {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub description: Option<String>,
    pub activities: Option<Activities>,
    pub base_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub origin: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
    pub available_seats: Option<i32>,
    #[serde(default)]
    pub destinations: Vec<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageChanges {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_price: Option<f64>,
    pub available_seats: Option<i32>,
    /// Replaces the current links when present.
    pub destinations: Option<Vec<i32>>,
}

/// Raw query-string filters. Values that fail to parse are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PackageSearch {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub start_from: Option<String>,
    pub end_until: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

const MAX_NAME_LEN: usize = 200;

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    check_len(name, MAX_NAME_LEN, "Name")?;
    Ok(name.to_string())
}

fn optional_origin(origin: Option<String>) -> AppResult<Option<String>> {
    let origin = non_blank(origin);
    if let Some(origin) = &origin {
        check_len(origin, MAX_NAME_LEN, "Origin")?;
    }
    Ok(origin)
}

fn check_non_negative(value: f64, what: &str) -> AppResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{what} must be a number greater than or equal to 0"
        )))
    }
}

fn check_seats(seats: i32) -> AppResult<()> {
    if seats < 0 {
        return Err(AppError::validation(
            "Available seats must be greater than or equal to 0",
        ));
    }
    Ok(())
}

fn check_dates(start: NaiveDate, end: NaiveDate) -> AppResult<()> {
    if end < start {
        return Err(AppError::validation(
            "End date must not be before the start date",
        ));
    }
    Ok(())
}

fn parse_date(value: Option<&String>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value?.trim(), "%Y-%m-%d").ok()
}

fn parse_price(value: Option<&String>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

pub async fn list_destinations(db: &DatabaseConnection) -> AppResult<Vec<destination::Model>> {
    Ok(Destination::find()
        .order_by_asc(destination::Column::Name)
        .all(db)
        .await?)
}

/// Most linked destinations first, topped up with the rest in id order.
pub async fn featured_destinations(
    db: &DatabaseConnection,
) -> AppResult<Vec<destination::Model>> {
    let links = PackageDestination::find().all(db).await?;
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for link in &links {
        *counts.entry(link.destination_id).or_default() += 1;
    }
    let mut ranked: Vec<(i32, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(FEATURED_LIMIT as usize);

    let ranked_ids: Vec<i32> = ranked.iter().map(|(id, _)| *id).collect();
    let mut popular = Destination::find()
        .filter(destination::Column::Id.is_in(ranked_ids.clone()))
        .all(db)
        .await?;
    popular.sort_by_key(|d| ranked_ids.iter().position(|id| *id == d.id));

    if popular.len() < FEATURED_LIMIT as usize {
        let seen: HashSet<i32> = popular.iter().map(|d| d.id).collect();
        let fillers = Destination::find()
            .order_by_asc(destination::Column::Id)
            .limit(FEATURED_LIMIT)
            .all(db)
            .await?;
        for d in fillers {
            if popular.len() >= FEATURED_LIMIT as usize {
                break;
            }
            if !seen.contains(&d.id) {
                popular.push(d);
            }
        }
    }

    Ok(popular)
}

pub async fn get_destination(
    db: &DatabaseConnection,
    destination_id: i32,
) -> AppResult<destination::Model> {
    Destination::find_by_id(destination_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Destination"))
}

/// Packages that include the destination.
pub async fn destination_packages(
    db: &DatabaseConnection,
    destination: &destination::Model,
) -> AppResult<Vec<package::Model>> {
    Ok(destination
        .find_related(Package)
        .order_by_asc(package::Column::StartDate)
        .all(db)
        .await?)
}

pub async fn create_destination(
    db: &DatabaseConnection,
    input: NewDestination,
) -> AppResult<destination::Model> {
    let name = required_name(&input.name)?;
    check_non_negative(input.base_cost, "Base cost")?;

    let model = destination::ActiveModel {
        name: Set(name),
        origin: Set(optional_origin(input.origin)?),
        description: Set(non_blank(input.description)),
        activities: Set(input.activities.and_then(Activities::joined)),
        base_cost: Set(input.base_cost),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

pub async fn update_destination(
    db: &DatabaseConnection,
    destination_id: i32,
    changes: DestinationChanges,
) -> AppResult<destination::Model> {
    let destination = get_destination(db, destination_id).await?;
    let mut active = destination.into_active_model();

    if let Some(name) = changes.name {
        active.name = Set(required_name(&name)?);
    }
    if let Some(origin) = changes.origin {
        active.origin = Set(optional_origin(Some(origin))?);
    }
    if let Some(description) = changes.description {
        active.description = Set(non_blank(Some(description)));
    }
    if let Some(activities) = changes.activities {
        active.activities = Set(activities.joined());
    }
    if let Some(base_cost) = changes.base_cost {
        check_non_negative(base_cost, "Base cost")?;
        active.base_cost = Set(base_cost);
    }

    Ok(active.update(db).await?)
}

/// Refuses while any package still includes the destination. Returns the deleted name.
pub async fn delete_destination(db: &DatabaseConnection, destination_id: i32) -> AppResult<String> {
    let txn = db.begin().await?;

    let destination = Destination::find_by_id(destination_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Destination"))?;

    let linked = PackageDestination::find()
        .filter(package_destination::Column::DestinationId.eq(destination_id))
        .count(&txn)
        .await?;
    if linked > 0 {
        return Err(AppError::conflict(format!(
            "Destination \"{}\" is included in {} package(s) and cannot be deleted",
            destination.name, linked
        )));
    }

    let name = destination.name.clone();
    destination.delete(&txn).await?;
    txn.commit().await?;
    Ok(name)
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

async fn with_destinations<C: ConnectionTrait>(
    conn: &C,
    packages: Vec<package::Model>,
) -> AppResult<Vec<PackageWithDestinations>> {
    if packages.is_empty() {
        return Ok(Vec::new());
    }
    let destinations = packages
        .load_many_to_many(Destination, PackageDestination, conn)
        .await?;
    Ok(packages.into_iter().zip(destinations).collect())
}

/// Links the package to every id in `destination_ids` that names an existing destination.
async fn link_destinations<C: ConnectionTrait>(
    conn: &C,
    package_id: i32,
    destination_ids: &[i32],
) -> AppResult<()> {
    if destination_ids.is_empty() {
        return Ok(());
    }
    let existing = Destination::find()
        .filter(destination::Column::Id.is_in(destination_ids.to_vec()))
        .order_by_asc(destination::Column::Id)
        .all(conn)
        .await?;
    if existing.is_empty() {
        return Ok(());
    }

    let links = existing.into_iter().map(|d| package_destination::ActiveModel {
        package_id: Set(package_id),
        destination_id: Set(d.id),
    });
    PackageDestination::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn list_packages(db: &DatabaseConnection) -> AppResult<Vec<PackageWithDestinations>> {
    let packages = Package::find()
        .order_by_asc(package::Column::Id)
        .all(db)
        .await?;
    with_destinations(db, packages).await
}

/// Bookable upcoming packages: most seats first, then soonest start.
pub async fn featured_packages(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> AppResult<Vec<PackageWithDestinations>> {
    let packages = Package::find()
        .filter(package::Column::AvailableSeats.gt(0))
        .filter(package::Column::StartDate.gte(today))
        .order_by_desc(package::Column::AvailableSeats)
        .order_by_asc(package::Column::StartDate)
        .limit(FEATURED_LIMIT)
        .all(db)
        .await?;
    with_destinations(db, packages).await
}

pub async fn find_package(db: &DatabaseConnection, package_id: i32) -> AppResult<package::Model> {
    Package::find_by_id(package_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Package"))
}

pub async fn get_package(
    db: &DatabaseConnection,
    package_id: i32,
) -> AppResult<PackageWithDestinations> {
    let package = find_package(db, package_id).await?;
    let destinations = package
        .find_related(Destination)
        .order_by_asc(destination::Column::Id)
        .all(db)
        .await?;
    Ok((package, destinations))
}

pub async fn create_package(
    db: &DatabaseConnection,
    input: NewPackage,
) -> AppResult<PackageWithDestinations> {
    let name = required_name(&input.name)?;
    let origin = optional_origin(input.origin)?;
    check_dates(input.start_date, input.end_date)?;
    check_non_negative(input.total_price, "Total price")?;
    let seats = input
        .available_seats
        .unwrap_or(package::DEFAULT_AVAILABLE_SEATS);
    check_seats(seats)?;

    let txn = db.begin().await?;
    let package = package::ActiveModel {
        name: Set(name),
        origin: Set(origin),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        total_price: Set(input.total_price),
        available_seats: Set(seats),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    link_destinations(&txn, package.id, &input.destinations).await?;
    let mut result = with_destinations(&txn, vec![package]).await?;
    txn.commit().await?;

    result.pop().ok_or_else(|| AppError::Internal("package vanished after insert".into()))
}

pub async fn update_package(
    db: &DatabaseConnection,
    package_id: i32,
    changes: PackageChanges,
) -> AppResult<PackageWithDestinations> {
    let txn = db.begin().await?;
    let package = Package::find_by_id(package_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Package"))?;

    check_dates(
        changes.start_date.unwrap_or(package.start_date),
        changes.end_date.unwrap_or(package.end_date),
    )?;

    let mut active = package.into_active_model();
    if let Some(name) = changes.name {
        active.name = Set(required_name(&name)?);
    }
    if let Some(origin) = changes.origin {
        active.origin = Set(optional_origin(Some(origin))?);
    }
    if let Some(start_date) = changes.start_date {
        active.start_date = Set(start_date);
    }
    if let Some(end_date) = changes.end_date {
        active.end_date = Set(end_date);
    }
    if let Some(total_price) = changes.total_price {
        check_non_negative(total_price, "Total price")?;
        active.total_price = Set(total_price);
    }
    if let Some(seats) = changes.available_seats {
        check_seats(seats)?;
        active.available_seats = Set(seats);
    }
    let package = active.update(&txn).await?;

    if let Some(destination_ids) = changes.destinations {
        PackageDestination::delete_many()
            .filter(package_destination::Column::PackageId.eq(package.id))
            .exec(&txn)
            .await?;
        link_destinations(&txn, package.id, &destination_ids).await?;
    }

    let mut result = with_destinations(&txn, vec![package]).await?;
    txn.commit().await?;
    result.pop().ok_or_else(|| AppError::Internal("package vanished after update".into()))
}

/// Refuses while confirmed reservations exist; otherwise removes the package together
/// with its cancelled reservations, their travelers and its destination links.
pub async fn delete_package(db: &DatabaseConnection, package_id: i32) -> AppResult<String> {
    let txn = db.begin().await?;

    let package = Package::find_by_id(package_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Package"))?;

    let confirmed = Reservation::find()
        .filter(reservation::Column::PackageId.eq(package_id))
        .filter(reservation::Column::Status.eq(reservation::Status::Confirmed))
        .count(&txn)
        .await?;
    if confirmed > 0 {
        return Err(AppError::conflict(format!(
            "Package \"{}\" has {} confirmed reservation(s); cancel them before deleting it",
            package.name, confirmed
        )));
    }

    let reservation_ids = Query::select()
        .column(reservation::Column::Id)
        .from(Reservation)
        .and_where(Expr::col(reservation::Column::PackageId).eq(package_id))
        .to_owned();
    Traveler::delete_many()
        .filter(traveler::Column::ReservationId.in_subquery(reservation_ids))
        .exec(&txn)
        .await?;
    Reservation::delete_many()
        .filter(reservation::Column::PackageId.eq(package_id))
        .exec(&txn)
        .await?;
    PackageDestination::delete_many()
        .filter(package_destination::Column::PackageId.eq(package_id))
        .exec(&txn)
        .await?;

    let name = package.name.clone();
    package.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(package_id, "deleted package {}", name);
    Ok(name)
}

pub async fn search_packages(
    db: &DatabaseConnection,
    search: PackageSearch,
) -> AppResult<Vec<PackageWithDestinations>> {
    let mut query = Package::find();

    if let Some(origin) = non_blank(search.origin.clone()) {
        query = query.filter(contains_ci((Package, package::Column::Origin), &origin));
    }
    if let Some(name) = non_blank(search.destination.clone()) {
        let matching = Query::select()
            .column((PackageDestination, package_destination::Column::PackageId))
            .from(PackageDestination)
            .inner_join(
                Destination,
                Expr::col((Destination, destination::Column::Id)).equals((
                    PackageDestination,
                    package_destination::Column::DestinationId,
                )),
            )
            .and_where(contains_ci((Destination, destination::Column::Name), &name))
            .to_owned();
        query = query.filter(package::Column::Id.in_subquery(matching));
    }
    if let Some(start) = parse_date(search.start_from.as_ref()) {
        query = query.filter(package::Column::StartDate.gte(start));
    }
    if let Some(end) = parse_date(search.end_until.as_ref()) {
        query = query.filter(package::Column::EndDate.lte(end));
    }
    if let Some(min) = parse_price(search.min_price.as_ref()) {
        query = query.filter(package::Column::TotalPrice.gte(min));
    }
    if let Some(max) = parse_price(search.max_price.as_ref()) {
        query = query.filter(package::Column::TotalPrice.lte(max));
    }

    let packages = query
        .order_by_asc(package::Column::StartDate)
        .order_by_asc(package::Column::Id)
        .all(db)
        .await?;
    with_destinations(db, packages).await
}
