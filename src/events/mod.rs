//! Domain event relay
//!
//! Event emission is a non-blocking, non-retrying side effect of a
//! successful business operation: failure to publish is logged and dropped,
//! never propagated to the caller. The bus itself provides at-least-once
//! delivery; nothing here depends on it for correctness.

use axum::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod kafka;
pub mod listener;

pub use kafka::KafkaEventBus;
pub use listener::ScheduledVisitListener;

/// Topics published and consumed by this service
pub mod topics {
    pub const USERS_REGISTERED: &str = "users.registered";
    pub const VISITS_REGISTERED: &str = "visits.registered";
    pub const VENDORS_RATING_UPDATED: &str = "vendors.rating_updated";
    /// Inbound topic, produced by the external visit scheduler
    pub const VISITS_SCHEDULED: &str = "visits.scheduled";
}

/// Event relay failure; never surfaced to API callers
#[derive(Error, Debug)]
pub enum EventRelayError {
    #[error("Failed to publish event: {0}")]
    Publish(String),

    #[error("Failed to connect to the event bus: {0}")]
    Connection(String),
}

/// Outbound event publisher
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a JSON payload keyed for partitioning.
    async fn publish(&self, topic: &str, key: &str, payload: Value)
        -> Result<(), EventRelayError>;
}

/// Failing-safe default publisher: accepts everything, sends nothing.
///
/// Used when no bus is configured and as the default in tests.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        _payload: Value,
    ) -> Result<(), EventRelayError> {
        tracing::debug!(topic, key, "Event bus not configured, dropping event");
        Ok(())
    }
}

/// Publish an event, logging and swallowing any failure.
pub async fn emit_best_effort(publisher: &dyn EventPublisher, topic: &str, key: &str, payload: Value) {
    if let Err(e) = publisher.publish(topic, key, payload).await {
        tracing::warn!(topic, key, error = %e, "Failed to publish event, dropping");
    }
}
