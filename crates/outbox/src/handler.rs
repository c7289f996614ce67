//! Per-kind dispatch, grounded in `internal/outbox/handler.go`'s
//! `instrument`/`MakeGlobalOutboxHandler`: decode the payload for the row's
//! `kind`, run it under a retry policy and a span, publish to the bus.

use crate::metrics;
use pingerus_bus::{BusProducer, STATUS_CHANGE_TOPIC};
use pingerus_core::{OutboxKind, OutboxMessage, PingerusError, StatusChangeMsg, StatusChangedPayload};
use pingerus_obs::{default_kafka_policy, retry_with_policy, tracectx};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Decodes and publishes one outbox row. Restores trace context from the
/// row before publishing so the downstream consumer continues the
/// originating span, then wraps the publish in the fixed Kafka retry
/// policy (6 attempts, 200ms/30s/±20%).
pub async fn dispatch(
    producer: &Arc<BusProducer>,
    cancel: &CancellationToken,
    message: &OutboxMessage,
) -> Result<(), PingerusError> {
    let start = Instant::now();
    let kind_label = kind_label(message.kind);

    let parent_cx = tracectx::extract(
        message.traceparent.as_deref(),
        message.tracestate.as_deref(),
        message.baggage.as_deref(),
    );
    let trace_headers = tracectx::inject(&parent_cx);
    let _guard = parent_cx.attach();

    let result = match message.kind {
        OutboxKind::StatusChanged => dispatch_status_changed(producer, cancel, message, &trace_headers).await,
    };

    metrics::HANDLER_LATENCY
        .with_label_values(&[kind_label])
        .observe(start.elapsed().as_secs_f64());
    if result.is_err() {
        metrics::HANDLER_ERRORS.with_label_values(&[kind_label]).inc();
    }
    result
}

async fn dispatch_status_changed(
    producer: &Arc<BusProducer>,
    cancel: &CancellationToken,
    message: &OutboxMessage,
    trace_headers: &tracectx::MapCarrier,
) -> Result<(), PingerusError> {
    let payload: StatusChangedPayload = serde_json::from_slice(&message.data)
        .map_err(|e| PingerusError::Permanent(format!("unmarshal status-changed payload: {e}")))?;

    let wire: StatusChangeMsg = payload.into();
    let key = wire.check_id.to_string();
    let policy = default_kafka_policy("outbox_status_changed");

    retry_with_policy(policy, cancel, || {
        let producer = Arc::clone(producer);
        let wire = wire;
        let key = key.clone();
        let trace_headers = trace_headers.clone();
        async move {
            producer
                .publish(STATUS_CHANGE_TOPIC, &key, &wire, &trace_headers)
                .await
                .map_err(anyhow::Error::from)
        }
    })
    .await
    .map_err(|e| PingerusError::Transient(e.to_string()))
}

const fn kind_label(kind: OutboxKind) -> &'static str {
    match kind {
        OutboxKind::StatusChanged => "status_changed",
    }
}
