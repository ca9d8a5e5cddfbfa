//! Kafka-backed event publisher

use std::time::Duration;

use axum::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde_json::Value;

use crate::config::{KafkaAuthScheme, KafkaConfig};

use super::{EventPublisher, EventRelayError};

/// Event bus producer shared process-wide.
///
/// Each publish awaits broker acknowledgement before returning, so a
/// successful call means the event reached the bus. Idempotence and
/// acks=all give the bus at-least-once semantics without duplicating
/// events on producer retries.
pub struct KafkaEventBus {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaEventBus {
    pub fn new(config: &KafkaConfig) -> Result<Self, EventRelayError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.bootstrap_url)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.send.max.retries", "5");

        if config.authentication_scheme == KafkaAuthScheme::Oauth {
            client_config
                .set("security.protocol", "sasl_ssl")
                .set("sasl.mechanism", "OAUTHBEARER");
        }

        let producer: FutureProducer = client_config
            .create()
            .map_err(|e| EventRelayError::Connection(e.to_string()))?;

        Ok(Self {
            producer,
            send_timeout: Duration::from_secs(5),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventBus {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Value,
    ) -> Result<(), EventRelayError> {
        let value = payload.to_string();
        let record = FutureRecord::to(topic).key(key).payload(&value);

        self.producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(e, _)| EventRelayError::Publish(e.to_string()))?;

        tracing::debug!(topic, key, "Event published");

        Ok(())
    }
}
