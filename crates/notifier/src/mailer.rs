//! SMTP delivery. Adapted from the teacher's `worker::mailer::Mailer`:
//! same authenticated/unauthenticated transport split and connection-pool
//! configuration, with a per-send timeout layered on top (spec's "5s
//! default").

use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("smtp connection failed: {0}")]
    ConnectionFailed(String),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, MailerError>;

#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    send_timeout: Duration,
}

impl Mailer {
    pub fn new(config: &SmtpConfig, send_timeout: Duration) -> Result<Self> {
        let transport = if let (Some(username), Some(password)) =
            (&config.username, &config.password)
        {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailerError::ConnectionFailed(e.to_string()))?
                .port(config.port)
                .credentials(Credentials::new(username.clone(), password.clone()))
                .pool_config(lettre::transport::smtp::PoolConfig::new().max_size(config.pool_size))
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .pool_config(lettre::transport::smtp::PoolConfig::new().max_size(config.pool_size))
                .build()
        };

        Ok(Self {
            transport,
            from: config.from.clone(),
            send_timeout,
        })
    }

    /// Sends one email, bounded by `send_timeout`. A timeout is reported as
    /// [`MailerError::Timeout`] so the caller treats it the same as any
    /// other send failure (error, no commit, redeliver).
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| MailerError::InvalidAddress(format!("from: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| MailerError::InvalidAddress(format!("to: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| MailerError::SendFailed(format!("build message: {e}")))?;

        match tokio::time::timeout(self.send_timeout, self.transport.send(email)).await {
            Ok(Ok(_)) => {
                tracing::info!(to, "email sent");
                Ok(())
            }
            Ok(Err(err)) => Err(MailerError::SendFailed(err.to_string())),
            Err(_) => Err(MailerError::Timeout(self.send_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn test_config(port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".to_string(),
            port,
            username: None,
            password: None,
            from: "pingerus@example.com".to_string(),
            pool_size: 1,
        }
    }

    #[tokio::test]
    async fn send_succeeds_against_a_stub_smtp_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();

            reader
                .get_mut()
                .write_all(b"220 localhost ESMTP\r\n")
                .await
                .unwrap();

            loop {
                line.clear();
                let n = reader.read_line(&mut line).await.unwrap();
                if n == 0 {
                    break;
                }
                let cmd = line.split_whitespace().next().unwrap_or("").to_uppercase();
                match cmd.as_str() {
                    "EHLO" | "HELO" => {
                        reader
                            .get_mut()
                            .write_all(b"250-localhost\r\n250 8BITMIME\r\n")
                            .await
                            .unwrap();
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
                        reader
                            .get_mut()
                            .write_all(b"250 2.0.0 Ok: queued\r\n")
                            .await
                            .unwrap();
                    }
                    "QUIT" => {
                        reader.get_mut().write_all(b"221 2.0.0 Bye\r\n").await.unwrap();
                        break;
                    }
                    _ => {
                        reader
                            .get_mut()
                            .write_all(b"500 Command not recognized\r\n")
                            .await
                            .unwrap();
                    }
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let mailer = Mailer::new(&test_config(port), Duration::from_secs(5)).unwrap();
        let result = mailer
            .send("recipient@example.com", "Site status changed", "body")
            .await;

        assert!(result.is_ok(), "send failed: {:?}", result.err());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn send_times_out_when_the_server_never_responds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let mailer = Mailer::new(&test_config(port), Duration::from_millis(100)).unwrap();
        let result = mailer.send("recipient@example.com", "subject", "body").await;

        assert!(matches!(result, Err(MailerError::Timeout(_))));
        server.abort();
    }
}
