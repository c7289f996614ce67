//! `StatusChangeMsg` handling: look up the check and its owning user, send
//! a fixed-template email, and best-effort record the notification.
//! Grounded in `examples/original_source/internal/services/email-notifier/handler.go`.

use crate::mailer::Mailer;
use crate::metrics;
use pingerus_core::{Clock, PingerusError, StatusChangeMsg};
use sqlx::PgPool;

fn format_subject(old: bool, new: bool) -> String {
    format!("Site status changed: {old} \u{2192} {new}")
}

fn format_body(host: &str, old: bool, new: bool, ts: chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "Hello!\n\nYour check ({host}) changed status: {old} \u{2192} {new} at {}.\n\n\u{2014} Pingerus",
        ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

pub async fn handle_status_change(
    pool: &PgPool,
    mailer: &Mailer,
    clock: &dyn Clock,
    msg: StatusChangeMsg,
    parent_cx: opentelemetry::Context,
) -> Result<(), PingerusError> {
    let _guard = parent_cx.attach();
    metrics::MESSAGES_CONSUMED.inc();

    if msg.check_id <= 0 {
        tracing::warn!(check_id = msg.check_id, "dropping status-change with invalid check id");
        return Ok(());
    }

    if msg.old == msg.new {
        tracing::debug!(check_id = msg.check_id, "dropping no-op status-change");
        return Ok(());
    }

    let check = pingerus_db::checks::get_by_id(pool, msg.check_id).await.map_err(|err| {
        metrics::ERRORS.inc();
        err
    })?;

    let user = pingerus_db::users::get_by_id(pool, check.user_id).await.map_err(|err| {
        metrics::ERRORS.inc();
        err
    })?;

    if user.email.trim().is_empty() {
        metrics::ERRORS.inc();
        return Err(PingerusError::Permanent(format!(
            "user {} has no email on file",
            user.id
        )));
    }

    let subject = format_subject(msg.old, msg.new);
    let body = format_body(&check.host, msg.old, msg.new, msg.ts);

    if let Err(err) = mailer.send(&user.email, &subject, &body).await {
        metrics::ERRORS.inc();
        return Err(PingerusError::Transient(format!("send email: {err}")));
    }
    metrics::EMAILS_SENT.inc();

    if let Err(err) =
        pingerus_db::notifications::create(pool, check.id, user.id, "email", clock.now(), &body).await
    {
        tracing::error!(check_id = check.id, error = %err, "best-effort notification insert failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn subject_matches_the_fixed_template() {
        assert_eq!(format_subject(false, true), "Site status changed: false \u{2192} true");
    }

    #[test]
    fn body_includes_host_and_rfc3339_timestamp() {
        let ts = chrono::DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let body = format_body("example.com", false, true, ts);
        assert!(body.contains("example.com"));
        assert!(body.contains("false \u{2192} true"));
        assert!(body.contains("2026-01-02T03:04:05Z"));
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn zero_check_id_is_dropped_without_touching_the_database(pool: PgPool) {
        let mailer = Mailer::new(
            &crate::config::SmtpConfig {
                host: "127.0.0.1".to_string(),
                port: 1,
                username: None,
                password: None,
                from: "pingerus@example.com".to_string(),
                pool_size: 1,
            },
            Duration::from_millis(50),
        )
        .unwrap();

        let msg = StatusChangeMsg {
            check_id: 0,
            old: false,
            new: true,
            ts: chrono::Utc::now(),
        };

        let clock = pingerus_core::SystemClock;
        handle_status_change(&pool, &mailer, &clock, msg, opentelemetry::Context::new())
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn no_op_transition_is_dropped(pool: PgPool) {
        let mailer = Mailer::new(
            &crate::config::SmtpConfig {
                host: "127.0.0.1".to_string(),
                port: 1,
                username: None,
                password: None,
                from: "pingerus@example.com".to_string(),
                pool_size: 1,
            },
            Duration::from_millis(50),
        )
        .unwrap();

        let msg = StatusChangeMsg {
            check_id: 42,
            old: true,
            new: true,
            ts: chrono::Utc::now(),
        };

        let clock = pingerus_core::SystemClock;
        handle_status_change(&pool, &mailer, &clock, msg, opentelemetry::Context::new())
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn missing_check_is_an_error_so_the_message_is_redelivered(pool: PgPool) {
        let mailer = Mailer::new(
            &crate::config::SmtpConfig {
                host: "127.0.0.1".to_string(),
                port: 1,
                username: None,
                password: None,
                from: "pingerus@example.com".to_string(),
                pool_size: 1,
            },
            Duration::from_millis(50),
        )
        .unwrap();

        let msg = StatusChangeMsg {
            check_id: 999_999,
            old: false,
            new: true,
            ts: chrono::Utc::now(),
        };

        let clock = pingerus_core::SystemClock;
        let result = handle_status_change(&pool, &mailer, &clock, msg, opentelemetry::Context::new()).await;
        assert!(matches!(result, Err(PingerusError::NotFound(_))));
    }

    async fn stub_smtp_server() -> (u16, tokio::task::JoinHandle<()>) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();

            reader.get_mut().write_all(b"220 localhost ESMTP\r\n").await.unwrap();

            loop {
                line.clear();
                let n = reader.read_line(&mut line).await.unwrap();
                if n == 0 {
                    break;
                }
                let cmd = line.split_whitespace().next().unwrap_or("").to_uppercase();
                match cmd.as_str() {
                    "EHLO" | "HELO" => {
                        reader.get_mut().write_all(b"250-localhost\r\n250 8BITMIME\r\n").await.unwrap();
                    }
                    "MAIL" => {
                        reader.get_mut().write_all(b"250 2.1.0 Ok\r\n").await.unwrap();
                    }
                    "RCPT" => {
                        reader.get_mut().write_all(b"250 2.1.5 Ok\r\n").await.unwrap();
                    }
                    "DATA" => {
                        reader
                            .get_mut()
                            .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                            .await
                            .unwrap();
                        loop {
                            line.clear();
                            let n = reader.read_line(&mut line).await.unwrap();
                            if n == 0 || line == ".\r\n" || line == ".\n" {
                                break;
                            }
                        }
                        reader.get_mut().write_all(b"250 2.0.0 Ok: queued\r\n").await.unwrap();
                    }
                    "QUIT" => {
                        reader.get_mut().write_all(b"221 2.0.0 Bye\r\n").await.unwrap();
                        break;
                    }
                    _ => {
                        reader.get_mut().write_all(b"500 Command not recognized\r\n").await.unwrap();
                    }
                }
            }
        });

        (port, handle)
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn status_change_sends_email_and_records_notification(pool: PgPool) {
        let (port, server) = stub_smtp_server().await;

        let user = pingerus_db::users::create(&pool, "owner@example.com", "hash")
            .await
            .unwrap();
        let check = pingerus_db::checks::create(&pool, user.id, "http://example.com", 60)
            .await
            .unwrap();

        let mailer = Mailer::new(
            &crate::config::SmtpConfig {
                host: "127.0.0.1".to_string(),
                port,
                username: None,
                password: None,
                from: "pingerus@example.com".to_string(),
                pool_size: 1,
            },
            Duration::from_secs(5),
        )
        .unwrap();

        let msg = StatusChangeMsg {
            check_id: check.id,
            old: false,
            new: true,
            ts: chrono::Utc::now(),
        };

        let clock = pingerus_core::SystemClock;
        handle_status_change(&pool, &mailer, &clock, msg, opentelemetry::Context::new())
            .await
            .unwrap();

        server.await.unwrap();

        let notifications = pingerus_db::notifications::list_by_user(&pool, user.id, 10)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "email");
        assert!(notifications[0].payload.contains("example.com"));
    }
}
