use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/user/register_as_client",
            post(handlers::user::register_as_client),
        )
        .route(
            "/user/register_as_vendor",
            post(handlers::user::register_as_vendor),
        )
        .route("/user/me", get(handlers::user::me))
        .route("/user/my_visits", get(handlers::user::my_visits))
}
