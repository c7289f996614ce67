//! `CheckRequest` handling: probe, persist, detect a status transition, and
//! on a transition write `Run` + `checks.last_status` + the outbox row in
//! one transaction. Grounded in
//! `examples/original_source/internal/pingworker/handler.go`'s
//! `HandleCheckRequest`.

use crate::{metrics, prober};
use pingerus_core::{CheckRequestMsg, CheckStatus, Clock, OutboxKind, PingerusError, StatusChangedPayload};
use pingerus_db::Transactor;
use pingerus_obs::tracectx;
use sqlx::PgPool;

/// `(old, new)` when the probe changed the check's externally-visible
/// status, `None` when it didn't — including the unknown-to-down case,
/// which is deliberately not a change (no alert on a first-observation
/// failure).
fn detect_change(last_status: CheckStatus, new_up: bool) -> Option<(bool, bool)> {
    match (last_status, new_up) {
        (CheckStatus::Unknown, true) => Some((false, true)),
        (CheckStatus::Unknown, false) => None,
        (CheckStatus::Up, true) | (CheckStatus::Down, false) => None,
        (CheckStatus::Up, false) => Some((true, false)),
        (CheckStatus::Down, true) => Some((false, true)),
    }
}

pub async fn handle_check_request(
    pool: &PgPool,
    transactor: &Transactor,
    client: &reqwest::Client,
    clock: &dyn Clock,
    msg: CheckRequestMsg,
    parent_cx: opentelemetry::Context,
) -> Result<(), PingerusError> {
    let _guard = parent_cx.attach();

    let check = match pingerus_db::checks::get_by_id(pool, msg.check_id).await {
        Ok(check) => check,
        Err(PingerusError::NotFound(_)) => {
            tracing::warn!(check_id = msg.check_id, "check no longer exists, dropping request");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let outcome = prober::probe(client, &check.host).await;
    metrics::PROBE_LATENCY.observe(outcome.latency_ms as f64 / 1000.0);
    metrics::PROBES_TOTAL
        .with_label_values(&[if outcome.up { "up" } else { "down" }])
        .inc();

    let ts = clock.now();
    let change = detect_change(check.last_status, outcome.up);

    let Some((old, new)) = change else {
        if let Err(err) =
            pingerus_db::runs::insert(pool, check.id, ts, outcome.up, outcome.code, outcome.latency_ms).await
        {
            tracing::error!(check_id = check.id, error = %err, "best-effort run insert failed");
        }
        return Ok(());
    };

    metrics::STATUS_CHANGED_TOTAL.inc();

    let cx = opentelemetry::Context::current();
    let trace_headers = tracectx::inject(&cx);
    let idempotency_key = format!("status:{}:{}", check.id, ts.timestamp_nanos_opt().unwrap_or_default());
    let payload = StatusChangedPayload {
        check_id: check.id,
        old,
        new,
        at: ts,
    };
    let data = serde_json::to_vec(&payload)
        .map_err(|e| PingerusError::Permanent(format!("encode status-changed payload: {e}")))?;

    transactor
        .with_tx(|tx| {
            let data = data.clone();
            let idempotency_key = idempotency_key.clone();
            let trace_headers = trace_headers.clone();
            async move {
                pingerus_db::runs::insert(
                    &mut *tx,
                    check.id,
                    ts,
                    outcome.up,
                    outcome.code,
                    outcome.latency_ms,
                )
                .await?;

                pingerus_db::checks::update_last_status(
                    &mut *tx,
                    check.id,
                    CheckStatus::from_db(Some(new)),
                )
                .await?;

                pingerus_db::outbox::enqueue(
                    &mut *tx,
                    &idempotency_key,
                    OutboxKind::StatusChanged,
                    &data,
                    trace_headers.0.get("traceparent").map(String::as_str),
                    trace_headers.0.get("tracestate").map(String::as_str),
                    trace_headers.0.get("baggage").map(String::as_str),
                )
                .await?;

                Ok(())
            }
        })
        .await
}
