use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Histogram,
};

pub static PROBES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pingworker_probes_total",
        "Probes executed, labelled by outcome.",
        &["outcome"]
    )
    .expect("pingworker_probes_total registers")
});

pub static PROBE_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pingworker_probe_latency_seconds",
        "Probe round-trip latency."
    )
    .expect("pingworker_probe_latency_seconds registers")
});

pub static STATUS_CHANGED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "pingworker_status_changed_total",
        "Probes that produced a status change."
    )
    .expect("pingworker_status_changed_total registers")
});

pub static HANDLER_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "pingworker_handler_errors_total",
        "CheckRequest handler errors."
    )
    .expect("pingworker_handler_errors_total registers")
});
