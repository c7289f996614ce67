//! Producer wrapper: JSON-encode a payload, attach W3C trace-context
//! headers, publish with acknowledgement. Grounded in the
//! `rdkafka::producer::FutureProducer` setup used by the identity-service
//! outbox publisher in the example pack (idempotent producer, `acks=all`).

use crate::error::BusError;
use pingerus_obs::tracectx::MapCarrier;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct BusProducer {
    producer: FutureProducer,
}

impl BusProducer {
    pub fn new(brokers: &str, client_id: &str) -> Result<Self, BusError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "10000")
            .create()
            .map_err(|e| BusError::Publish(format!("failed to create producer: {e}")))?;

        Ok(Self { producer })
    }

    /// Publishes `payload` as JSON to `topic`, keyed by `key`, with
    /// `trace_headers` carried as message headers so the consumer can
    /// continue the originating trace.
    pub async fn publish<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        payload: &T,
        trace_headers: &MapCarrier,
    ) -> Result<(), BusError> {
        let body = serde_json::to_vec(payload)?;

        let mut headers = rdkafka::message::OwnedHeaders::new();
        for (k, v) in &trace_headers.0 {
            headers = headers.insert(rdkafka::message::Header {
                key: k.as_str(),
                value: Some(v.as_str()),
            });
        }

        let record = FutureRecord::to(topic)
            .key(key)
            .payload(&body)
            .headers(headers);

        self.producer
            .send(record, Duration::from_secs(10))
            .await
            .map_err(|(err, _msg)| BusError::Publish(err.to_string()))?;

        Ok(())
    }
}
