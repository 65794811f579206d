use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

const RESET_SUBJECT: &str = "[MovieUs] 비밀번호 재설정 안내";

/// Outbound account mail
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> AppResult<()>;
}

fn reset_body(reset_url: &str) -> String {
    format!(
        "아래 링크에서 비밀번호를 재설정하세요.\n\n{}\n\n본인이 요청하지 않았다면 이 메일을 무시하셔도 됩니다.",
        reset_url
    )
}

/// Delivers through an SMTP relay with STARTTLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Returns `None` when no SMTP host is configured
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(None);
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| AppError::Mail(format!("Invalid SMTP relay {}: {}", host, e)))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .mail_from
            .parse()
            .map_err(|e| AppError::Mail(format!("Invalid sender {}: {}", config.mail_from, e)))?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> AppResult<()> {
        let to: Mailbox = email
            .parse()
            .map_err(|e| AppError::Mail(format!("Invalid recipient {}: {}", email, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(RESET_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(reset_body(reset_url))
            .map_err(|e| AppError::Mail(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(e.to_string()))?;

        tracing::info!(email = %email, "Password reset mail sent");
        Ok(())
    }
}

/// Writes the reset link to the log instead of sending it
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> AppResult<()> {
        tracing::info!(email = %email, reset_url = %reset_url, "SMTP not configured, reset link logged only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_body_contains_link() {
        let body = reset_body("http://localhost:3000/change-pw/a@b.com");
        assert!(body.contains("http://localhost:3000/change-pw/a@b.com"));
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        assert!(LogMailer
            .send_password_reset("a@b.com", "http://localhost/reset")
            .await
            .is_ok());
    }
}
