//! HTTP request handlers

pub mod auth;
pub mod payment;
pub mod user;
pub mod visit;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::db;

/// Liveness and database reachability probe
pub async fn health(State(pool): State<PgPool>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match db::check_health(&pool).await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "database": "reachable",
            "version": env!("CARGO_PKG_VERSION"),
        }))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "database": e.to_string(),
            })),
        )),
    }
}
