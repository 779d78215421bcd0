use axum::extract::{Extension, Json};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{middleware::CurrentUser, session::Session, views};
use crate::cart::CartError;
use crate::error::{AppError, AppResult};
use crate::services::{
    catalog,
    reservations::{self, NewReservation},
};

fn forbid_admins(session: &Session) -> AppResult<()> {
    if session.data().is_admin() {
        return Err(AppError::forbidden("Administrators cannot use the cart"));
    }
    Ok(())
}

fn quantity(raw: i64) -> AppResult<u32> {
    u32::try_from(raw).map_err(|_| CartError::InvalidQuantity.into())
}

fn count_body(session: &Session) -> Value {
    json!({ "count": session.data().cart.total_quantity() })
}

pub async fn view_cart(
    Extension(db): Extension<DatabaseConnection>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Value>> {
    let cart = session.data().cart;

    let mut items = Vec::with_capacity(cart.lines.len());
    let mut stale = Vec::new();
    let mut total = 0.0;
    for line in &cart.lines {
        let package = match catalog::get_package(&db, line.package_id).await {
            Ok(package) => package,
            Err(AppError::NotFound(_)) => {
                stale.push(line.token);
                continue;
            }
            Err(e) => return Err(e),
        };
        let subtotal = package.0.total_price * f64::from(line.quantity);
        total += subtotal;
        items.push(json!({
            "token": line.token,
            "quantity": line.quantity,
            "subtotal": subtotal,
            "package": views::package_with_destinations(&package),
        }));
    }

    if !stale.is_empty() {
        tracing::debug!(lines = stale.len(), "dropping cart lines for deleted packages");
        session.update(|data| data.cart.lines.retain(|l| !stale.contains(&l.token)));
    }

    Ok(Json(json!({
        "items": items,
        "total": total,
        "count": session.data().cart.total_quantity(),
    })))
}

#[derive(serde::Deserialize)]
pub struct AddToCartRequest {
    package_id: i32,
    #[serde(default = "default_quantity")]
    quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

pub async fn add_to_cart(
    Extension(db): Extension<DatabaseConnection>,
    Extension(session): Extension<Session>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<Value>> {
    forbid_admins(&session)?;
    let quantity = quantity(payload.quantity)?;
    let package = catalog::find_package(&db, payload.package_id).await?;

    let token = session.update(|data| data.cart.add(package.id, quantity, package.available_seats))?;

    tracing::Span::current()
        .record("action", "cart_add")
        .record("business_event", "Package added to cart");

    let mut body = count_body(&session);
    body["token"] = json!(token);
    Ok(Json(body))
}

#[derive(serde::Deserialize)]
pub struct UpdateCartRequest {
    token: Uuid,
    quantity: i64,
}

pub async fn update_cart_line(
    Extension(db): Extension<DatabaseConnection>,
    Extension(session): Extension<Session>,
    Json(payload): Json<UpdateCartRequest>,
) -> AppResult<Json<Value>> {
    forbid_admins(&session)?;
    let quantity = quantity(payload.quantity)?;
    let package_id = session
        .data()
        .cart
        .line(payload.token)
        .map(|l| l.package_id)
        .ok_or(CartError::LineNotFound)?;
    let package = catalog::find_package(&db, package_id).await?;

    session.update(|data| {
        data.cart
            .update_quantity(payload.token, quantity, package.available_seats)
    })?;

    Ok(Json(count_body(&session)))
}

#[derive(serde::Deserialize)]
pub struct RemoveFromCartRequest {
    token: Uuid,
}

pub async fn remove_from_cart(
    Extension(session): Extension<Session>,
    Json(payload): Json<RemoveFromCartRequest>,
) -> AppResult<Json<Value>> {
    session.update(|data| data.cart.remove(payload.token))?;
    Ok(Json(count_body(&session)))
}

pub async fn clear_cart(Extension(session): Extension<Session>) -> Json<Value> {
    session.update(|data| data.cart.clear());
    Json(count_body(&session))
}

pub async fn cart_count(Extension(session): Extension<Session>) -> Json<Value> {
    Json(count_body(&session))
}

#[derive(Default, serde::Deserialize)]
pub struct CheckoutRequest {
    contact_phone: Option<String>,
    comments: Option<String>,
}

/// Books every cart line separately. Lines that fail stay in the cart.
pub async fn checkout(
    Extension(db): Extension<DatabaseConnection>,
    Extension(session): Extension<Session>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<Value>> {
    forbid_admins(&session)?;
    let lines = session.data().cart.lines;
    if lines.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }

    let mut created = Vec::new();
    let mut failed = Vec::new();
    for line in lines {
        let request = NewReservation {
            package_id: line.package_id,
            passenger_count: i32::try_from(line.quantity).unwrap_or(i32::MAX),
            contact_phone: payload.contact_phone.clone(),
            comments: payload.comments.clone(),
            travelers: Vec::new(),
        };
        match reservations::create(&db, current.id, request).await {
            Ok(reservation) => {
                crate::metrics::record_reservation_created(reservation.passenger_count);
                session.update(|data| data.cart.remove(line.token).ok());
                created.push(reservations::get(&db, reservation.id).await?);
            }
            Err(e) if e.status().is_server_error() => return Err(e),
            Err(e) => failed.push(json!({
                "token": line.token,
                "package_id": line.package_id,
                "quantity": line.quantity,
                "error": e.to_string(),
            })),
        }
    }

    let summary = format!("Checkout: {} booked, {} failed", created.len(), failed.len());
    tracing::Span::current()
        .record("table", "reservations")
        .record("action", "cart_checkout")
        .record("business_event", summary.as_str());
    crate::metrics::record_checkout(created.len(), failed.len());

    Ok(Json(json!({
        "created": views::reservations(&created),
        "failed": failed,
        "count": session.data().cart.total_quantity(),
    })))
}
