//! Shared application state

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::payments::PaymentService;
use crate::users::UserService;
use crate::visits::VisitService;

/// Application state handed to the router; services are shared via `Arc`
/// so extractors can pull out just the piece they need.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub visit_service: Arc<VisitService>,
    pub payment_service: Arc<PaymentService>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(state: &AppState) -> Self {
        state.user_service.clone()
    }
}

impl FromRef<AppState> for Arc<VisitService> {
    fn from_ref(state: &AppState) -> Self {
        state.visit_service.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentService> {
    fn from_ref(state: &AppState) -> Self {
        state.payment_service.clone()
    }
}
