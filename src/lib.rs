//! Visit manager backend
//!
//! HTTP service for client/vendor registration, visit booking and
//! lifecycle, post-visit reviews, payment orchestration and an
//! at-least-once event relay to the message bus.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod state;
pub mod users;
pub mod visits;
