use once_cell::sync::Lazy;
use prometheus::{register_counter, register_histogram, Counter, Histogram};

pub static FETCHED: Lazy<Counter> = Lazy::new(|| {
    register_counter!("scheduler_checks_fetched_total", "Due checks fetched from DB.")
        .expect("scheduler_checks_fetched_total registers")
});

pub static SENT: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "scheduler_messages_sent_total",
        "CheckRequest published to the bus."
    )
    .expect("scheduler_messages_sent_total registers")
});

pub static ERRORS: Lazy<Counter> = Lazy::new(|| {
    register_counter!("scheduler_errors_total", "Errors in the scheduler loop.")
        .expect("scheduler_errors_total registers")
});

pub static LOOP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!("scheduler_loop_duration_seconds", "Scheduler tick duration.")
        .expect("scheduler_loop_duration_seconds registers")
});
