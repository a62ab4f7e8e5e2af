use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{Channel, SmsConfig};
use crate::error::NotifyError;
use crate::notifier::Notifier;

const TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Sends alerts as a text message through the Twilio REST API.
///
/// SMS has no subject line, so only the body is delivered.
pub struct SmsNotifier {
    client: reqwest::Client,
    config: SmsConfig,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: String,
}

impl SmsNotifier {
    pub fn new(config: &SmsConfig) -> Result<Self, Report<NotifyError>> {
        Self::with_base_url(config, TWILIO_BASE_URL)
    }

    /// Point the notifier at a Twilio-compatible API other than the public one.
    pub fn with_base_url(
        config: &SmsConfig,
        base_url: &str,
    ) -> Result<Self, Report<NotifyError>> {
        let client = reqwest::Client::builder()
            .build()
            .change_context(NotifyError::Build {
                channel: Channel::Sms.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: messages_url(base_url, &config.account_sid),
            config: config.clone(),
        })
    }
}

impl Notifier for SmsNotifier {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn notify<'a>(
        &'a self,
        _subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            let params = [
                ("To", self.config.to_number.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ];

            let response = self
                .client
                .post(&self.endpoint)
                .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
                .form(&params)
                .send()
                .await
                .change_context(send_error())?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(Report::new(send_error())
                    .attach(format!("HTTP status: {status}"))
                    .attach(format!("response: {detail}")));
            }

            // A 2xx means Twilio accepted the message; the body is informational.
            match response.json::<TwilioMessage>().await {
                Ok(message) => {
                    debug!(sid = %message.sid, status = %message.status, "sms queued");
                }
                Err(e) => {
                    warn!(%status, error = %e, "sms accepted but response body was unreadable");
                }
            }
            Ok(())
        })
    }
}

fn messages_url(base: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        base.trim_end_matches('/'),
        account_sid
    )
}

fn send_error() -> NotifyError {
    NotifyError::Send {
        channel: Channel::Sms.to_string(),
    }
}
