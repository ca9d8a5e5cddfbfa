use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/visit/register_visit", post(handlers::visit::register_visit))
        .route("/visit/book", post(handlers::visit::book))
        .route("/visit/vendor/my_visits", get(handlers::visit::vendor_visits))
        .route("/visit/client/my_visits", get(handlers::visit::client_visits))
        .route(
            "/visit/get_visit_code/:visit_id",
            get(handlers::visit::get_visit_code),
        )
        .route(
            "/visit/check_visit_code",
            post(handlers::visit::check_visit_code),
        )
        .route("/visit/add_opinion", post(handlers::visit::add_opinion))
        .route("/visit/:visit_id/status", post(handlers::visit::update_status))
}
