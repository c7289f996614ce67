//! Named to match `internal/services/email-notifier`'s `promauto` metrics.

use once_cell::sync::Lazy;
use prometheus::{register_counter, Counter};

pub static MESSAGES_CONSUMED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "email_notifier_messages_consumed_total",
        "Total status-change messages consumed"
    )
    .unwrap()
});

pub static EMAILS_SENT: Lazy<Counter> = Lazy::new(|| {
    register_counter!("email_notifier_emails_sent_total", "Total emails sent").unwrap()
});

pub static ERRORS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "email_notifier_errors_total",
        "Total handler errors (message redelivered)"
    )
    .unwrap()
});
