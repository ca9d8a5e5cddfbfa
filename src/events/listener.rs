//! Background listener for externally scheduled visits
//!
//! Consumes the inbound `visits.scheduled` topic and feeds each payload
//! into the visit registration path. Runs as a long-lived task parallel to
//! request handling; malformed payloads are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};

use crate::config::{KafkaAuthScheme, KafkaConfig};
use crate::visits::{NewVisit, VisitService};

use super::EventRelayError;

/// Consumer of scheduler-produced visit events
pub struct ScheduledVisitListener {
    consumer: StreamConsumer,
    topic: String,
    visit_service: Arc<VisitService>,
}

impl ScheduledVisitListener {
    pub fn new(
        config: &KafkaConfig,
        visit_service: Arc<VisitService>,
    ) -> Result<Self, EventRelayError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.bootstrap_url)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true");

        if config.authentication_scheme == KafkaAuthScheme::Oauth {
            client_config
                .set("security.protocol", "sasl_ssl")
                .set("sasl.mechanism", "OAUTHBEARER");
        }

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| EventRelayError::Connection(e.to_string()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| EventRelayError::Connection(e.to_string()))?;

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            visit_service,
        })
    }

    /// Poll the bus until the process shuts down.
    pub async fn run(self) {
        tracing::info!(topic = %self.topic, "Listening for scheduled visit events");

        loop {
            match self.consumer.recv().await {
                Ok(message) => self.handle_message(&message).await,
                Err(e) => {
                    tracing::error!(error = %e, "Error receiving from event bus");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle_message(&self, message: &BorrowedMessage<'_>) {
        let Some(payload) = message.payload() else {
            tracing::warn!(offset = message.offset(), "Dropping event with empty payload");
            return;
        };

        // Malformed payloads are dropped, not retried or dead-lettered.
        let new_visit = match serde_json::from_slice::<NewVisit>(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    offset = message.offset(),
                    error = %e,
                    "Dropping malformed scheduled-visit payload"
                );
                return;
            }
        };

        let visit_id = new_visit.visit_id;
        match self.visit_service.register_visit(new_visit).await {
            Ok(_) => tracing::info!(%visit_id, "Registered externally scheduled visit"),
            Err(e) => tracing::error!(%visit_id, error = %e, "Failed to register scheduled visit"),
        }
    }
}
