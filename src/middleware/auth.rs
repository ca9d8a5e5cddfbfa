//! Bearer-token extractor
//!
//! Handlers take a `Principal` argument to require authentication; the
//! extractor verifies the token against the auth service held in app state.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use crate::auth::{get_user_id_from_claims, verify_token, AuthService};
use crate::error::ApiError;
use crate::models::PrincipalRole;

/// Authenticated caller identity, decoded from the access token
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: PrincipalRole,
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthenticated("Missing bearer token".to_string()))?;

        let auth = Arc::<AuthService>::from_ref(state);
        let claims = verify_token(bearer.token(), auth.jwt_secret(), auth.algorithm())?;

        let user_id = get_user_id_from_claims(&claims)?;
        let role = PrincipalRole::parse(&claims.role)
            .ok_or_else(|| ApiError::Unauthenticated("Unknown role claim".to_string()))?;

        Ok(Principal {
            user_id,
            email: claims.email,
            role,
        })
    }
}
