use error_stack::Report;
use futures::future::BoxFuture;

use crate::config::Channel;
use crate::error::NotifyError;
use crate::notifier::Notifier;

/// Writes alerts to the log instead of sending them anywhere.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn channel(&self) -> Channel {
        Channel::Terminal
    }

    fn notify<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            tracing::warn!(subject, "ALERT: {}", body.trim_end());
            Ok(())
        })
    }
}
