//! Payment handlers
//!
//! All payment endpoints require an authenticated caller; no role gate
//! beyond that.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use crate::error::ApiResult;
use crate::middleware::Principal;
use crate::models::Payment;
use crate::payments::{ChargeRequest, PaymentService};

/// POST /payment/charge
pub async fn create_charge(
    State(payments): State<Arc<PaymentService>>,
    _principal: Principal,
    Json(request): Json<ChargeRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let payment = payments.create_charge(request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST /payment/refund/last
pub async fn refund_last(
    State(payments): State<Arc<PaymentService>>,
    _principal: Principal,
) -> ApiResult<Json<Payment>> {
    Ok(Json(payments.refund_last_charge().await?))
}

/// POST /payment/refund/:charge_id
///
/// Keyed by the external processor's charge id, not the local payment id.
pub async fn refund(
    State(payments): State<Arc<PaymentService>>,
    _principal: Principal,
    Path(charge_id): Path<String>,
) -> ApiResult<Json<Payment>> {
    Ok(Json(payments.refund_charge(&charge_id).await?))
}

/// GET /payment/charges
pub async fn list_charges(
    State(payments): State<Arc<PaymentService>>,
    _principal: Principal,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(payments.list_charges().await?))
}
