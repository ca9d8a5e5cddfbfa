//! User and role-profile handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{AuthService, RegisterRequest, RegisterResponse};
use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::models::{PrincipalRole, Visit};
use crate::users::{ClientRegistration, MeResponse, UserService, VendorRegistration};
use crate::visits::VisitService;

/// POST /user/register_as_client
pub async fn register_as_client(
    State(auth): State<Arc<AuthService>>,
    principal: Principal,
    Json(registration): Json<ClientRegistration>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let response = auth
        .complete_registration(principal.user_id, RegisterRequest::Client(registration))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /user/register_as_vendor
pub async fn register_as_vendor(
    State(auth): State<Arc<AuthService>>,
    principal: Principal,
    Json(registration): Json<VendorRegistration>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let response = auth
        .complete_registration(principal.user_id, RegisterRequest::Vendor(registration))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /user/me
pub async fn me(
    State(users): State<Arc<UserService>>,
    principal: Principal,
) -> ApiResult<Json<MeResponse>> {
    let response = users.me(principal.user_id).await?;
    Ok(Json(response))
}

/// GET /user/my_visits
///
/// Dispatches on the caller's role; profile-less users have no visits to
/// list.
pub async fn my_visits(
    State(visits): State<Arc<VisitService>>,
    principal: Principal,
) -> ApiResult<Json<Vec<Visit>>> {
    let result = match principal.role {
        PrincipalRole::Client => visits.visits_for_client(&principal).await?,
        PrincipalRole::Vendor => visits.visits_for_vendor(&principal).await?,
        _ => {
            return Err(ApiError::Forbidden(
                "Register as a client or vendor first".to_string(),
            ))
        }
    };
    Ok(Json(result))
}
