#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use travelbook_server::{
    entities::{destination, package, user},
    migrator::Migrator,
    rut,
    services::{
        accounts::{self, Registration},
        catalog::{self, NewDestination, NewPackage},
    },
};

/// Fresh in-memory database with every migration applied. One connection only, so
/// each test sees a single shared database.
pub async fn setup_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    date(2026, 10, 19)
}

/// A well-formed RUT for the given body.
pub fn rut_for(body: u32) -> String {
    let body = body.to_string();
    let dv = rut::check_digit(&body).unwrap();
    format!("{body}-{dv}")
}

pub fn registration(name: &str, email: &str, rut_body: u32) -> Registration {
    Registration {
        full_name: name.to_string(),
        national_id: rut_for(rut_body),
        email: email.to_string(),
        password: "secret123".to_string(),
        confirm_password: "secret123".to_string(),
        birth_date: date(1990, 5, 17),
        phone: "+56912345678".to_string(),
    }
}

pub async fn create_user(db: &DatabaseConnection, email: &str, rut_body: u32) -> user::Model {
    accounts::register(db, registration("Ana Rojas", email, rut_body), today())
        .await
        .unwrap()
}

pub async fn create_admin(db: &DatabaseConnection, email: &str, rut_body: u32) -> user::Model {
    create_user(db, email, rut_body).await;
    accounts::promote_to_admin(db, email).await.unwrap()
}

pub async fn create_destination(db: &DatabaseConnection, name: &str) -> destination::Model {
    catalog::create_destination(
        db,
        NewDestination {
            name: name.to_string(),
            origin: None,
            description: Some(format!("{name} description")),
            activities: None,
            base_cost: 100.0,
        },
    )
    .await
    .unwrap()
}

pub async fn create_package(
    db: &DatabaseConnection,
    name: &str,
    seats: i32,
    destinations: Vec<i32>,
) -> package::Model {
    catalog::create_package(
        db,
        NewPackage {
            name: name.to_string(),
            origin: Some("Santiago".to_string()),
            start_date: date(2030, 1, 10),
            end_date: date(2030, 1, 20),
            total_price: 1200.0,
            available_seats: Some(seats),
            destinations,
        },
    )
    .await
    .unwrap()
    .0
}

pub async fn seats_left(db: &DatabaseConnection, package_id: i32) -> i32 {
    catalog::find_package(db, package_id)
        .await
        .unwrap()
        .available_seats
}
