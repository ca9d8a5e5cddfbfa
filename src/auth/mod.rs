//! Authentication: Google sign-in, JWT issuance and verification

pub mod google;
pub mod jwt;
pub mod service;

pub use google::{GoogleTokenInfoClient, GoogleTokenVerifier, GoogleUserInfo};
pub use jwt::{generate_access_token, get_user_id_from_claims, verify_token, Claims, JwtError};
pub use service::{
    AuthService, GoogleAuthResponse, GoogleLoginRequest, RegisterRequest, RegisterResponse,
    UserSummary,
};
