pub mod email;
pub mod sms;
pub mod terminal;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::config::{Channel, ChannelConfig};
use crate::error::NotifyError;
use email::EmailNotifier;
use sms::SmsNotifier;
use terminal::TerminalNotifier;

/// Outbound channel for price alerts.
///
/// Implementations make a single attempt; retrying is left to the next run.
pub trait Notifier: Send + Sync {
    fn channel(&self) -> Channel;

    fn notify<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>>;
}

/// Construct the notifier selected by configuration.
pub fn build(config: &ChannelConfig) -> Result<Box<dyn Notifier>, Report<NotifyError>> {
    Ok(match config {
        ChannelConfig::Email(email) => Box::new(EmailNotifier::new(email)?),
        ChannelConfig::Sms(sms) => Box::new(SmsNotifier::new(sms)?),
        ChannelConfig::Terminal => Box::new(TerminalNotifier),
    })
}
