//! The bus-consumer contract shared by the Ping Worker and Email Notifier:
//! fetch one message, extract trace context, invoke the handler under a
//! child span, commit the offset only on success, back off on fetch errors,
//! shut down promptly after the in-flight message on cancellation.

use crate::error::BusError;
use pingerus_obs::tracectx;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    pub fetch_backoff_base: Duration,
    pub fetch_backoff_max: Duration,
}

impl ConsumerConfig {
    #[must_use]
    pub fn new(brokers: impl Into<String>, group_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
            topic: topic.into(),
            fetch_backoff_base: Duration::from_millis(200),
            fetch_backoff_max: Duration::from_secs(10),
        }
    }
}

fn build_consumer(config: &ConsumerConfig) -> Result<StreamConsumer, BusError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .create()
        .map_err(|e| BusError::Fetch(format!("failed to create consumer: {e}")))?;

    consumer
        .subscribe(&[config.topic.as_str()])
        .map_err(|e| BusError::Fetch(format!("failed to subscribe to {}: {e}", config.topic)))?;

    Ok(consumer)
}

/// Runs the fetch/decode/handle/commit loop until `cancel` fires. `handler`
/// receives the decoded payload and the extracted parent trace context; a
/// handler error leaves the offset uncommitted so the message is reprocessed
/// on the next rebalance or restart.
pub async fn run_consumer<T, H, Fut>(
    config: ConsumerConfig,
    cancel: CancellationToken,
    handler: H,
) -> Result<(), BusError>
where
    T: DeserializeOwned,
    H: Fn(T, opentelemetry::Context) -> Fut,
    Fut: Future<Output = Result<(), pingerus_core::PingerusError>>,
{
    let consumer = build_consumer(&config)?;
    let mut fetch_backoff = config.fetch_backoff_base;

    loop {
        if cancel.is_cancelled() {
            tracing::info!(topic = %config.topic, "consumer stopping on cancellation");
            return Ok(());
        }

        let message = tokio::select! {
            result = consumer.recv() => result,
            () = cancel.cancelled() => {
                tracing::info!(topic = %config.topic, "consumer cancelled mid-fetch");
                return Ok(());
            }
        };

        let message = match message {
            Ok(msg) => {
                fetch_backoff = config.fetch_backoff_base;
                msg
            }
            Err(err) => {
                tracing::warn!(topic = %config.topic, error = %err, backoff_ms = fetch_backoff.as_millis(), "fetch error, backing off");
                tokio::select! {
                    () = tokio::time::sleep(fetch_backoff) => {}
                    () = cancel.cancelled() => return Ok(()),
                }
                fetch_backoff = (fetch_backoff * 2).min(config.fetch_backoff_max);
                continue;
            }
        };

        let carrier = extract_headers(&message);
        let parent_cx = tracectx::extract(
            carrier.0.get("traceparent").map(String::as_str),
            carrier.0.get("tracestate").map(String::as_str),
            carrier.0.get("baggage").map(String::as_str),
        );

        let payload = message.payload().unwrap_or_default();
        match serde_json::from_slice::<T>(payload) {
            Ok(decoded) => match handler(decoded, parent_cx).await {
                Ok(()) => {
                    if let Err(err) = consumer.commit_message(&message, CommitMode::Async) {
                        tracing::warn!(topic = %config.topic, error = %err, "offset commit failed");
                    }
                }
                Err(err) => {
                    tracing::error!(topic = %config.topic, error = %err, "handler error, offset not committed");
                }
            },
            Err(err) => {
                // Malformed message: permanent, not recoverable by retry.
                // Committing avoids a poison-message loop; this matches the
                // dispatcher's treatment of unknown outbox kinds as errors
                // rather than infinite redelivery.
                tracing::error!(topic = %config.topic, error = %err, "malformed message, committing to skip");
                if let Err(commit_err) = consumer.commit_message(&message, CommitMode::Async) {
                    tracing::warn!(topic = %config.topic, error = %commit_err, "offset commit failed");
                }
            }
        }
    }
}

fn extract_headers(message: &rdkafka::message::BorrowedMessage<'_>) -> tracectx::MapCarrier {
    let mut carrier = tracectx::MapCarrier::default();
    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            if let Some(value) = header.value {
                if let Ok(value) = std::str::from_utf8(value) {
                    carrier.0.insert(header.key.to_string(), value.to_string());
                }
            }
        }
    }
    carrier
}
