//! Reservation lifecycle and the seat bookkeeping that goes with it.
//!
//! `packages.available_seats` must always equal the initial capacity minus the
//! passenger counts of the package's confirmed reservations. Every transition below
//! runs in one transaction, and seats are only ever taken through a conditional
//! update so the counter cannot go negative under concurrent bookings.

use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, IntoActiveModel, JoinType, LoaderTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::Deserialize;

use super::{check_len, contains_ci, non_blank};
use crate::entities::{
    package, reservation, reservation::Status, traveler, user, Package, Reservation, Traveler,
    User,
};
use crate::error::{AppError, AppResult};

const MAX_NAME_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 20;
const MAX_NATIONAL_ID_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TravelerInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub national_id: String,
    /// `YYYY-MM-DD`; anything else is stored as unknown.
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub package_id: i32,
    #[serde(default = "one_passenger")]
    pub passenger_count: i32,
    pub contact_phone: Option<String>,
    pub comments: Option<String>,
    #[serde(default)]
    pub travelers: Vec<TravelerInput>,
}

fn one_passenger() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct ReservationFilter {
    pub search: Option<String>,
    pub status: Option<Status>,
}

/// A reservation with everything a listing needs to show it.
#[derive(Debug, Clone)]
pub struct ReservationDetails {
    pub reservation: reservation::Model,
    pub user: Option<user::Model>,
    pub package: Option<package::Model>,
    pub travelers: Vec<traveler::Model>,
}

struct ValidTraveler {
    full_name: String,
    national_id: String,
    birth_date: Option<NaiveDate>,
    phone: String,
    email: Option<String>,
}

impl TryFrom<TravelerInput> for ValidTraveler {
    type Error = AppError;

    fn try_from(input: TravelerInput) -> Result<Self, Self::Error> {
        let phone = input.phone.trim().to_string();
        if phone.is_empty() {
            return Err(AppError::validation("Traveler phone is required"));
        }
        check_len(&phone, MAX_PHONE_LEN, "Traveler phone")?;
        let full_name = input.full_name.trim().to_string();
        check_len(&full_name, MAX_NAME_LEN, "Traveler name")?;
        let national_id = input.national_id.trim().to_string();
        check_len(&national_id, MAX_NATIONAL_ID_LEN, "Traveler national id")?;
        let email = non_blank(input.email);
        if let Some(email) = &email {
            check_len(email, MAX_EMAIL_LEN, "Traveler email")?;
        }
        Ok(Self {
            full_name,
            national_id,
            birth_date: input
                .birth_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            phone,
            email,
        })
    }
}

/// Takes `seats` from the package only if that many are still available.
async fn take_seats<C: ConnectionTrait>(conn: &C, package_id: i32, seats: i32) -> AppResult<bool> {
    let res = Package::update_many()
        .col_expr(
            package::Column::AvailableSeats,
            Expr::col(package::Column::AvailableSeats).sub(seats),
        )
        .filter(package::Column::Id.eq(package_id))
        .filter(package::Column::AvailableSeats.gte(seats))
        .exec(conn)
        .await?;
    Ok(res.rows_affected == 1)
}

async fn release_seats<C: ConnectionTrait>(conn: &C, package_id: i32, seats: i32) -> AppResult<()> {
    Package::update_many()
        .col_expr(
            package::Column::AvailableSeats,
            Expr::col(package::Column::AvailableSeats).add(seats),
        )
        .filter(package::Column::Id.eq(package_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn not_enough_seats(available: i32, requested: i32) -> AppError {
    AppError::validation(format!(
        "Not enough seats available. Available: {available}, requested: {requested}"
    ))
}

pub async fn create(
    db: &DatabaseConnection,
    user_id: i32,
    input: NewReservation,
) -> AppResult<reservation::Model> {
    let passengers = input.passenger_count;
    if passengers < 1 {
        return Err(AppError::validation(
            "Passenger count must be at least 1",
        ));
    }
    let travelers = input
        .travelers
        .into_iter()
        .map(ValidTraveler::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    let contact_phone = non_blank(input.contact_phone);
    if let Some(phone) = &contact_phone {
        check_len(phone, MAX_PHONE_LEN, "Contact phone")?;
    }

    let txn = db.begin().await?;

    let package = Package::find_by_id(input.package_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Package"))?;
    if package.available_seats < passengers {
        return Err(not_enough_seats(package.available_seats, passengers));
    }
    if !take_seats(&txn, package.id, passengers).await? {
        return Err(not_enough_seats(package.available_seats, passengers));
    }

    let reservation = reservation::ActiveModel {
        user_id: Set(user_id),
        package_id: Set(package.id),
        created_at: Set(chrono::Utc::now().naive_utc()),
        status: Set(Status::Confirmed),
        passenger_count: Set(passengers),
        contact_phone: Set(contact_phone),
        comments: Set(non_blank(input.comments)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !travelers.is_empty() {
        let rows = travelers.into_iter().map(|t| traveler::ActiveModel {
            reservation_id: Set(reservation.id),
            full_name: Set(t.full_name),
            national_id: Set(t.national_id),
            birth_date: Set(t.birth_date),
            phone: Set(t.phone),
            email: Set(t.email),
            ..Default::default()
        });
        Traveler::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(
        reservation_id = reservation.id,
        package_id = package.id,
        passengers,
        "reservation created"
    );
    Ok(reservation)
}

/// Moves a reservation between `confirmed` and `cancelled`, adjusting seats.
/// Setting the current status again changes nothing.
pub async fn update_status(
    db: &DatabaseConnection,
    reservation_id: i32,
    new_status: Status,
) -> AppResult<reservation::Model> {
    let txn = db.begin().await?;

    let reservation = Reservation::find_by_id(reservation_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;
    let previous = reservation.status;
    if previous == new_status {
        return Ok(reservation);
    }

    let package_id = reservation.package_id;
    let passengers = reservation.passenger_count;
    match (previous, new_status) {
        (Status::Confirmed, Status::Cancelled) => {
            release_seats(&txn, package_id, passengers).await?;
        }
        (Status::Cancelled, Status::Confirmed) => {
            if !take_seats(&txn, package_id, passengers).await? {
                return Err(AppError::validation(
                    "Not enough seats available to reconfirm this reservation",
                ));
            }
        }
        _ => {}
    }

    let mut active = reservation.into_active_model();
    active.status = Set(new_status);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        reservation_id,
        from = ?previous,
        to = ?new_status,
        "reservation status changed"
    );
    Ok(updated)
}

/// Removes a reservation and its travelers, giving seats back if it was confirmed.
pub async fn delete(db: &DatabaseConnection, reservation_id: i32) -> AppResult<reservation::Model> {
    let txn = db.begin().await?;

    let reservation = Reservation::find_by_id(reservation_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;

    if reservation.status == Status::Confirmed {
        release_seats(&txn, reservation.package_id, reservation.passenger_count).await?;
    }

    Traveler::delete_many()
        .filter(traveler::Column::ReservationId.eq(reservation.id))
        .exec(&txn)
        .await?;
    reservation.clone().delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(reservation_id, "reservation deleted");
    Ok(reservation)
}

pub async fn find(db: &DatabaseConnection, reservation_id: i32) -> AppResult<reservation::Model> {
    Reservation::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("Reservation"))
}

async fn with_details(
    db: &DatabaseConnection,
    reservations: Vec<reservation::Model>,
) -> AppResult<Vec<ReservationDetails>> {
    if reservations.is_empty() {
        return Ok(Vec::new());
    }
    let users = reservations.load_one(User, db).await?;
    let packages = reservations.load_one(Package, db).await?;
    let travelers = reservations.load_many(Traveler, db).await?;

    Ok(reservations
        .into_iter()
        .zip(users)
        .zip(packages)
        .zip(travelers)
        .map(|(((reservation, user), package), travelers)| ReservationDetails {
            reservation,
            user,
            package,
            travelers,
        })
        .collect())
}

pub async fn get(db: &DatabaseConnection, reservation_id: i32) -> AppResult<ReservationDetails> {
    let reservation = find(db, reservation_id).await?;
    with_details(db, vec![reservation])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Reservation"))
}

pub async fn list_all(db: &DatabaseConnection) -> AppResult<Vec<ReservationDetails>> {
    let reservations = Reservation::find()
        .order_by_desc(reservation::Column::CreatedAt)
        .order_by_desc(reservation::Column::Id)
        .all(db)
        .await?;
    with_details(db, reservations).await
}

pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> AppResult<Vec<ReservationDetails>> {
    let reservations = Reservation::find()
        .filter(reservation::Column::UserId.eq(user_id))
        .order_by_desc(reservation::Column::CreatedAt)
        .order_by_desc(reservation::Column::Id)
        .all(db)
        .await?;
    with_details(db, reservations).await
}

/// Reservation report: free-text match on customer name, email or package name,
/// optionally narrowed to one status.
pub async fn admin_list(
    db: &DatabaseConnection,
    filter: ReservationFilter,
) -> AppResult<Vec<ReservationDetails>> {
    let mut query = Reservation::find();

    if let Some(term) = non_blank(filter.search) {
        query = query
            .join(JoinType::InnerJoin, reservation::Relation::User.def())
            .join(JoinType::InnerJoin, reservation::Relation::Package.def())
            .filter(
                Condition::any()
                    .add(contains_ci((User, user::Column::FullName), &term))
                    .add(contains_ci((User, user::Column::Email), &term))
                    .add(contains_ci((Package, package::Column::Name), &term)),
            );
    }
    if let Some(status) = filter.status {
        query = query.filter(reservation::Column::Status.eq(status));
    }

    let reservations = query
        .order_by_desc(reservation::Column::CreatedAt)
        .order_by_desc(reservation::Column::Id)
        .all(db)
        .await?;
    with_details(db, reservations).await
}
