//! W3C trace-context carriage across the outbox row and bus message
//! boundaries, mirroring the Go original's use of
//! `otel.GetTextMapPropagator()` over a `propagation.MapCarrier`.

use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::collections::HashMap;

/// A plain string-keyed carrier, usable both as an outbox row's three
/// trace columns and as Kafka message headers.
#[derive(Debug, Clone, Default)]
pub struct MapCarrier(pub HashMap<String, String>);

impl Injector for MapCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

impl Extractor for MapCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Injects the current span's trace context into a fresh [`MapCarrier`],
/// to be written into the outbox row's `traceparent`/`tracestate`/`baggage`
/// columns at enqueue time.
#[must_use]
pub fn inject(cx: &Context) -> MapCarrier {
    let propagator = TraceContextPropagator::new();
    let mut carrier = MapCarrier::default();
    propagator.inject_context(cx, &mut carrier);
    carrier
}

/// Extracts a parent [`Context`] from the three trace columns read off an
/// outbox row, continuing the trace that originated the enqueue.
#[must_use]
pub fn extract(
    traceparent: Option<&str>,
    tracestate: Option<&str>,
    baggage: Option<&str>,
) -> Context {
    let mut carrier = MapCarrier::default();
    if let Some(tp) = traceparent {
        carrier.0.insert("traceparent".to_string(), tp.to_string());
    }
    if let Some(ts) = tracestate {
        carrier.0.insert("tracestate".to_string(), ts.to_string());
    }
    if let Some(bg) = baggage {
        carrier.0.insert("baggage".to_string(), bg.to_string());
    }
    let propagator = TraceContextPropagator::new();
    propagator.extract(&carrier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TraceContextExt;

    #[test]
    fn extract_of_empty_carrier_yields_no_span_context() {
        let cx = extract(None, None, None);
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn inject_then_extract_round_trips_a_valid_traceparent() {
        let carrier = MapCarrier(HashMap::from([(
            "traceparent".to_string(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_string(),
        )]));
        let propagator = TraceContextPropagator::new();
        let cx = propagator.extract(&carrier);
        assert!(cx.span().span_context().is_valid());

        let reinjected = inject(&cx);
        assert_eq!(
            reinjected.0.get("traceparent").map(String::as_str),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );
    }
}
