use axum::{routing::post, Router};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", post(handlers::auth::google_login))
        .route("/register", post(handlers::auth::register))
}
