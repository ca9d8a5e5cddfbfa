use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment/charge", post(handlers::payment::create_charge))
        .route("/payment/refund/last", post(handlers::payment::refund_last))
        .route("/payment/refund/:charge_id", post(handlers::payment::refund))
        .route("/payment/charges", get(handlers::payment::list_charges))
}
