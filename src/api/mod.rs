pub mod admin;
pub mod auth;
pub mod cart;
pub mod destinations;
pub mod middleware;
pub mod packages;
pub mod profile;
pub mod reservations;
pub mod session;
pub mod views;

use axum::{
    middleware::from_fn,
    routing::{get, post, put, MethodRouter},
    Extension, Router,
};
use sea_orm::DatabaseConnection;

use self::middleware::{require_admin, require_login};
use self::session::SessionStore;

async fn health_check() -> &'static str {
    "OK"
}

fn admin_only(route: MethodRouter) -> MethodRouter {
    route.route_layer(from_fn(require_admin))
}

/// All application routes with sessions attached. Observability and CORS layers are
/// added by the server binary.
pub fn router(db: DatabaseConnection, sessions: SessionStore) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(
            Router::new()
                .route(
                    "/profile",
                    get(profile::get_profile).patch(profile::update_profile),
                )
                .route("/profile/reservations", get(profile::my_reservations))
                .route_layer(from_fn(require_login)),
        );

    let reservation_routes = Router::new()
        .route("/reservations", post(reservations::create_reservation))
        .route(
            "/reservations/:id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route(
            "/reservations/user/:user_id",
            get(reservations::list_user_reservations),
        )
        .route("/cart/checkout", post(cart::checkout))
        .route_layer(from_fn(require_login));

    let api_routes = Router::new()
        .route(
            "/destinations",
            get(destinations::list_destinations)
                .merge(admin_only(post(destinations::create_destination))),
        )
        .route(
            "/destinations/:id",
            get(destinations::get_destination).merge(admin_only(
                put(destinations::update_destination).delete(destinations::delete_destination),
            )),
        )
        .route(
            "/packages",
            get(packages::list_packages).merge(admin_only(post(packages::create_package))),
        )
        .route(
            "/packages/:id",
            get(packages::get_package).merge(admin_only(
                put(packages::update_package).delete(packages::delete_package),
            )),
        )
        .route("/search", get(packages::search_packages))
        .route("/cart", get(cart::view_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/update", post(cart::update_cart_line))
        .route("/cart/remove", post(cart::remove_from_cart))
        .route("/cart/clear", post(cart::clear_cart))
        .route("/cart/count", get(cart::cart_count))
        .merge(reservation_routes);

    let admin_routes = Router::new()
        .route("/reservations", get(admin::reservation_report))
        .route("/reservations/:id", get(admin::reservation_detail))
        .route_layer(from_fn(require_admin));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .nest("/admin", admin_routes)
        .layer(from_fn(session::load_session))
        .layer(Extension(sessions))
        .layer(Extension(db))
        .layer(tower_cookies::CookieManagerLayer::new())
}
