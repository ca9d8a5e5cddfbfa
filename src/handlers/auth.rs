//! Authentication handlers

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::auth::{
    AuthService, GoogleAuthResponse, GoogleLoginRequest, RegisterRequest, RegisterResponse,
};
use crate::error::ApiResult;
use crate::middleware::Principal;

/// POST /auth/google
pub async fn google_login(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<GoogleLoginRequest>,
) -> ApiResult<Json<GoogleAuthResponse>> {
    let response = auth.login_with_google(&request.id_token).await?;
    Ok(Json(response))
}

/// POST /register
///
/// Role-tagged registration body; reissues a token carrying the new role.
pub async fn register(
    State(auth): State<Arc<AuthService>>,
    principal: Principal,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let response = auth.complete_registration(principal.user_id, request).await?;
    Ok(Json(response))
}
