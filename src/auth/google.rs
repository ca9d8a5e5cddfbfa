//! Google ID token verification
//!
//! The identity provider is an external collaborator: this module only
//! validates an inbound id token and extracts the profile fields needed to
//! create or look up a user.

use axum::async_trait;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Profile fields extracted from a verified Google id token
#[derive(Debug, Clone)]
pub struct GoogleUserInfo {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

/// Verifier for Google-issued id tokens
#[async_trait]
pub trait GoogleTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> ApiResult<GoogleUserInfo>;
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    aud: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

/// Verifier backed by Google's tokeninfo endpoint
pub struct GoogleTokenInfoClient {
    http: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleTokenInfoClient {
    pub fn new(client_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
        }
    }
}

#[async_trait]
impl GoogleTokenVerifier for GoogleTokenInfoClient {
    async fn verify(&self, id_token: &str) -> ApiResult<GoogleUserInfo> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("tokeninfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Unauthenticated("Invalid Google token".to_string()));
        }

        let info: TokenInfoResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Internal(format!("tokeninfo response unreadable: {}", e)))?;

        // The token must have been issued for this application.
        if info.aud != self.client_id {
            return Err(ApiError::Unauthenticated("Invalid Google token".to_string()));
        }

        Ok(GoogleUserInfo {
            email: info.email,
            given_name: info.given_name,
            family_name: info.family_name,
        })
    }
}
