use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_gauge, register_counter_vec, register_histogram,
    register_histogram_vec, Counter, CounterVec, Gauge, Histogram, HistogramVec,
};

pub static PICKED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("outbox_picked_total", "Messages picked into processing.")
        .expect("outbox_picked_total registers")
});

pub static OK: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "outbox_processed_ok_total",
        "Messages processed successfully."
    )
    .expect("outbox_processed_ok_total registers")
});

pub static ERR: Lazy<Counter> = Lazy::new(|| {
    register_counter!("outbox_processed_err_total", "Handler errors.")
        .expect("outbox_processed_err_total registers")
});

pub static TICK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!("outbox_tick_duration_seconds", "Tick duration.")
        .expect("outbox_tick_duration_seconds registers")
});

pub static LAST_BATCH_SIZE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("outbox_last_batch_size", "Size of last picked batch.")
        .expect("outbox_last_batch_size registers")
});

pub static HANDLER_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "outbox_handler_latency_seconds",
        "Latency of outbox handlers (publish, etc.)",
        &["kind"]
    )
    .expect("outbox_handler_latency_seconds registers")
});

pub static HANDLER_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "outbox_handler_errors_total",
        "Errors in outbox handlers (after retries).",
        &["kind"]
    )
    .expect("outbox_handler_errors_total registers")
});
