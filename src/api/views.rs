//! JSON shapes shared by several handlers.

use serde_json::{json, Value};

use crate::entities::{destination, package, user};
use crate::services::{catalog::PackageWithDestinations, reservations::ReservationDetails};

pub fn destination(d: &destination::Model) -> Value {
    json!({
        "id": d.id,
        "name": d.name,
        "origin": d.origin,
        "description": d.description,
        "activities": d.activity_list(),
        "base_cost": d.base_cost,
    })
}

pub fn package(p: &package::Model) -> Value {
    json!({
        "id": p.id,
        "name": p.name,
        "origin": p.origin,
        "start_date": p.start_date,
        "end_date": p.end_date,
        "total_price": p.total_price,
        "available_seats": p.available_seats,
    })
}

pub fn package_with_destinations((p, destinations): &PackageWithDestinations) -> Value {
    let mut value = package(p);
    value["destinations"] = destinations.iter().map(destination).collect();
    value
}

pub fn user_summary(u: &user::Model) -> Value {
    json!({ "id": u.id, "full_name": u.full_name, "email": u.email })
}

pub fn reservation(details: &ReservationDetails) -> Value {
    let r = &details.reservation;
    json!({
        "id": r.id,
        "user_id": r.user_id,
        "package_id": r.package_id,
        "created_at": r.created_at,
        "status": r.status,
        "passenger_count": r.passenger_count,
        "contact_phone": r.contact_phone,
        "comments": r.comments,
        "user": details.user.as_ref().map(user_summary),
        "package": details.package.as_ref().map(package),
        "travelers": details.travelers,
    })
}

pub fn reservations(list: &[ReservationDetails]) -> Value {
    list.iter().map(reservation).collect()
}
