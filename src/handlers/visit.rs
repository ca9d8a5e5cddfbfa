//! Visit lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::Principal;
use crate::models::{Visit, VisitStatus};
use crate::visits::{BookVisitRequest, NewVisit, VisitService};

#[derive(Debug, Deserialize)]
pub struct CheckVisitCodeRequest {
    pub visit_id: Uuid,
    pub visit_code: String,
}

#[derive(Debug, Deserialize)]
pub struct AddOpinionRequest {
    pub visit_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: VisitStatus,
}

/// POST /visit/register_visit
///
/// Scheduler-facing ingestion endpoint; mirrors what the event listener
/// consumes from the bus.
pub async fn register_visit(
    State(visits): State<Arc<VisitService>>,
    Json(new_visit): Json<NewVisit>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let visit = visits.register_visit(new_visit).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "ok", "visit_id": visit.visit_id })),
    ))
}

/// POST /visit/book
pub async fn book(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
    Json(request): Json<BookVisitRequest>,
) -> ApiResult<(StatusCode, Json<Visit>)> {
    let visit = visits.book_visit(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

/// GET /visit/vendor/my_visits
pub async fn vendor_visits(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
) -> ApiResult<Json<Vec<Visit>>> {
    Ok(Json(visits.visits_for_vendor(&principal).await?))
}

/// GET /visit/client/my_visits
pub async fn client_visits(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
) -> ApiResult<Json<Vec<Visit>>> {
    Ok(Json(visits.visits_for_client(&principal).await?))
}

/// GET /visit/get_visit_code/:visit_id
pub async fn get_visit_code(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
    Path(visit_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let code = visits.get_visit_code(visit_id, &principal).await?;
    Ok(Json(json!({ "visit_code": code })))
}

/// POST /visit/check_visit_code
pub async fn check_visit_code(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
    Json(request): Json<CheckVisitCodeRequest>,
) -> ApiResult<Json<Value>> {
    let valid = visits
        .check_visit_code(request.visit_id, &request.visit_code, &principal)
        .await?;
    Ok(Json(json!({ "valid": valid })))
}

/// POST /visit/add_opinion
pub async fn add_opinion(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
    Json(request): Json<AddOpinionRequest>,
) -> ApiResult<Json<Value>> {
    let new_avg = visits
        .add_opinion(&principal, request.visit_id, request.score, request.comment)
        .await?;
    Ok(Json(json!({ "status": "ok", "new_avg_score": new_avg })))
}

/// POST /visit/:visit_id/status
pub async fn update_status(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
    Path(visit_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Visit>> {
    let visit = visits
        .update_status(&principal, visit_id, request.status)
        .await?;
    Ok(Json(visit))
}
