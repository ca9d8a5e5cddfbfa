//! Google sign-in and access-token issuance

use std::sync::Arc;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::Role;
use crate::users::{ClientRegistration, UserService, VendorRegistration};

use super::google::GoogleTokenVerifier;
use super::jwt::generate_access_token;

/// Google sign-in request body
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

/// Identity summary embedded in auth responses
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

/// Response for a successful Google sign-in
#[derive(Debug, Serialize)]
pub struct GoogleAuthResponse {
    /// True when the identity record was created by this login
    pub is_new: bool,
    pub access_token: String,
    pub token_type: String,
    pub user: UserSummary,
}

/// Role-profile registration request body
#[derive(Debug, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RegisterRequest {
    Client(ClientRegistration),
    Vendor(VendorRegistration),
}

/// Response for a completed role-profile registration, with a fresh token
/// carrying the new role.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserSummary,
}

/// Authentication service: verifies Google identities and issues access
/// tokens. Profile-less users still get a token (role `unassigned`) so they
/// can reach the registration endpoints.
pub struct AuthService {
    users: Arc<UserService>,
    google: Arc<dyn GoogleTokenVerifier>,
    jwt_secret: String,
    jwt_algorithm: Algorithm,
    access_token_ttl_minutes: i64,
}

impl AuthService {
    pub fn new(
        config: &Config,
        users: Arc<UserService>,
        google: Arc<dyn GoogleTokenVerifier>,
    ) -> Self {
        Self {
            users,
            google,
            jwt_secret: config.jwt_secret.clone(),
            jwt_algorithm: config.jwt_algorithm,
            access_token_ttl_minutes: config.access_token_ttl_minutes,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.jwt_algorithm
    }

    /// Verify a Google id token, upsert the identity record and issue an
    /// access token carrying the user's current role.
    pub async fn login_with_google(&self, id_token: &str) -> ApiResult<GoogleAuthResponse> {
        let info = self.google.verify(id_token).await?;

        let existed = self.users.email_exists(&info.email).await?;
        let user = self
            .users
            .get_or_create_user(&info.email, &info.given_name, &info.family_name)
            .await?;
        let role = self.users.resolve_role(user.user_id).await?;

        let access_token = self.issue_token(user.user_id, &user.email, &role)?;

        Ok(GoogleAuthResponse {
            is_new: !existed,
            access_token,
            token_type: "bearer".to_string(),
            user: UserSummary {
                user_id: user.user_id,
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
                role: role.as_str().to_string(),
            },
        })
    }

    /// Register a role-profile for an authenticated user and reissue a token
    /// reflecting the new role.
    pub async fn complete_registration(
        &self,
        user_id: Uuid,
        request: RegisterRequest,
    ) -> ApiResult<RegisterResponse> {
        match request {
            RegisterRequest::Client(registration) => {
                self.users.register_as_client(user_id, registration).await?;
            }
            RegisterRequest::Vendor(registration) => {
                self.users.register_as_vendor(user_id, registration).await?;
            }
        }

        let user = self.users.get_user(user_id).await?;
        let role = self.users.resolve_role(user_id).await?;
        let access_token = self.issue_token(user.user_id, &user.email, &role)?;

        Ok(RegisterResponse {
            access_token,
            token_type: "bearer".to_string(),
            user: UserSummary {
                user_id: user.user_id,
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
                role: role.as_str().to_string(),
            },
        })
    }

    fn issue_token(&self, user_id: Uuid, email: &str, role: &Role) -> ApiResult<String> {
        generate_access_token(
            user_id,
            email,
            role.as_str(),
            &self.jwt_secret,
            self.jwt_algorithm,
            self.access_token_ttl_minutes,
        )
        .map_err(ApiError::from)
    }
}
