use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{reservation, Destination, Package, Reservation, User};

/// Seeds the catalog and booking gauges from the database.
pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = User::find().count(db).await.unwrap_or(0);
    metrics::gauge!("travelbook_users_total").set(user_count as f64);

    let destination_count = Destination::find().count(db).await.unwrap_or(0);
    metrics::gauge!("travelbook_destinations_total").set(destination_count as f64);

    let package_count = Package::find().count(db).await.unwrap_or(0);
    metrics::gauge!("travelbook_packages_total").set(package_count as f64);

    let confirmed = Reservation::find()
        .filter(reservation::Column::Status.eq(reservation::Status::Confirmed))
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("travelbook_confirmed_reservations").set(confirmed as f64);

    tracing::info!(
        "Initialized metrics: Users={}, Destinations={}, Packages={}, Confirmed reservations={}",
        user_count,
        destination_count,
        package_count,
        confirmed
    );
}

pub fn record_user_registered() {
    metrics::counter!("travelbook_users_registered_total").increment(1);
    metrics::gauge!("travelbook_users_total").increment(1.0);
}

/// `kind` is `destinations` or `packages`.
pub fn adjust_catalog_gauge(kind: &'static str, delta: f64) {
    let gauge = match kind {
        "destinations" => metrics::gauge!("travelbook_destinations_total"),
        _ => metrics::gauge!("travelbook_packages_total"),
    };
    gauge.increment(delta);
}

pub fn record_reservation_created(passengers: i32) {
    metrics::counter!("travelbook_reservations_created_total").increment(1);
    metrics::counter!("travelbook_seats_booked_total").increment(passengers.max(0) as u64);
    metrics::gauge!("travelbook_confirmed_reservations").increment(1.0);
}

pub fn record_reservation_status(status: reservation::Status) {
    let label = match status {
        reservation::Status::Confirmed => "confirmed",
        reservation::Status::Cancelled => "cancelled",
    };
    metrics::counter!("travelbook_reservation_status_changes_total", "to" => label).increment(1);
    let delta = if status == reservation::Status::Confirmed { 1.0 } else { -1.0 };
    metrics::gauge!("travelbook_confirmed_reservations").increment(delta);
}

pub fn record_reservation_deleted(was_confirmed: bool) {
    metrics::counter!("travelbook_reservations_deleted_total").increment(1);
    if was_confirmed {
        metrics::gauge!("travelbook_confirmed_reservations").decrement(1.0);
    }
}

pub fn record_checkout(booked: usize, failed: usize) {
    metrics::counter!("travelbook_checkout_lines_total", "outcome" => "booked").increment(booked as u64);
    metrics::counter!("travelbook_checkout_lines_total", "outcome" => "failed").increment(failed as u64);
}
