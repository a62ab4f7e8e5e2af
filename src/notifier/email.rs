use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::{Channel, EmailConfig};
use crate::error::NotifyError;
use crate::notifier::Notifier;

/// Sends plain-text alerts over SMTP, upgrading the session with STARTTLS
/// before authenticating.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, Report<NotifyError>> {
        let from: Mailbox = config
            .from
            .parse()
            .change_context(build_error())
            .attach_with(|| format!("EMAIL_FROM: {:?}", config.from))?;
        let to: Mailbox = config
            .to
            .parse()
            .change_context(build_error())
            .attach_with(|| format!("EMAIL_TO: {:?}", config.to))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
            .change_context(build_error())
            .attach_with(|| format!("SMTP server: {}", config.server))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from, to })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message, Report<NotifyError>> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .change_context(send_error())
    }
}

impl Notifier for EmailNotifier {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn notify<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            let message = self.message(subject, body)?;
            let response = self
                .transport
                .send(message)
                .await
                .change_context(send_error())
                .attach_with(|| format!("to: {}", self.to))?;

            debug!(code = %response.code(), "smtp server accepted message");
            Ok(())
        })
    }
}

fn build_error() -> NotifyError {
    NotifyError::Build {
        channel: Channel::Email.to_string(),
    }
}

fn send_error() -> NotifyError {
    NotifyError::Send {
        channel: Channel::Email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> EmailConfig {
        EmailConfig {
            server: "smtp.example.com".into(),
            port: 587,
            from: from.into(),
            to: "Renter <me@example.com>".into(),
            username: from.into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn invalid_sender_address_is_rejected() {
        let err = EmailNotifier::new(&config("not-an-address")).err().expect("error");
        assert!(matches!(err.current_context(), NotifyError::Build { .. }));
    }

    #[tokio::test]
    async fn message_carries_subject_and_plain_body() {
        let notifier = EmailNotifier::new(&config("watcher@example.com")).unwrap();
        let message = notifier
            .message("Apartment price alert", "Current quote: $2,671\n")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Apartment price alert"));
        assert!(raw.contains("From: watcher@example.com"));
        assert!(raw.contains("me@example.com"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("Current quote: $2,671"));
    }
}
