use tracing::{error, info, warn};

use crate::config::TargetConfig;
use crate::decision::{Decision, evaluate};
use crate::error::StateError;
use crate::extract::ExtractorChain;
use crate::fetch::PageSource;
use crate::model::{Price, format_dollars};
use crate::notifier::Notifier;
use crate::storage::PriceStore;

pub const ALERT_SUBJECT: &str = "Apartment price alert";

/// What a single check ended up doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// The page could not be fetched or held no recognisable price.
    ExtractionFailed,
    /// The last-notified price could not be read.
    StateUnavailable,
    /// A price was found but did not qualify for an alert.
    Skipped(Decision),
    /// The alert could not be delivered; state was left untouched.
    NotifyFailed { price: Price },
    /// The alert was delivered. `persisted` is false if recording it failed.
    Notified { price: Price, persisted: bool },
}

/// Fetch, extract, decide, notify and persist, in that order.
///
/// Every failure past configuration is logged and reported through the
/// returned outcome; nothing here aborts the process.
pub async fn run_once(
    target: &TargetConfig,
    source: &dyn PageSource,
    extractors: &ExtractorChain,
    store: &dyn PriceStore,
    notifier: &dyn Notifier,
) -> RunOutcome {
    let channel = notifier.channel();

    // ── Fetch + extract ───────────────────────────────────────────────────────
    let page = match source.fetch(&target.url).await {
        Ok(page) => page,
        Err(e) => {
            error!(error = ?e, "error fetching price page");
            return RunOutcome::ExtractionFailed;
        }
    };

    let current = match extractors.extract(&page) {
        Ok(price) => price,
        Err(e) => {
            error!(error = ?e, "error parsing price");
            return RunOutcome::ExtractionFailed;
        }
    };

    info!(price = %current, "current price {}", format_dollars(current.amount()));

    // ── Decide ────────────────────────────────────────────────────────────────
    let last_notified = match store.load().await {
        Ok(last) => last,
        Err(e) if matches!(e.current_context(), StateError::Parse) => {
            warn!(error = ?e, "ignoring unreadable last-notified price");
            None
        }
        Err(e) => {
            error!(error = ?e, "cannot read last-notified price");
            return RunOutcome::StateUnavailable;
        }
    };

    let decision = evaluate(current, target.threshold, last_notified);
    match decision {
        Decision::AboveThreshold => {
            info!(
                "price is above threshold ({}); no {channel} sent",
                format_threshold(target.threshold)
            );
            return RunOutcome::Skipped(decision);
        }
        Decision::NotLower { previous } => {
            info!(
                "price {current} is not lower than last notified price {previous}; no {channel} sent"
            );
            return RunOutcome::Skipped(decision);
        }
        Decision::FirstAlert => info!("no previous alert on record"),
        Decision::PriceDropped { previous } => {
            info!(%previous, "price dropped since last alert");
        }
    }

    // ── Notify ────────────────────────────────────────────────────────────────
    let body = alert_body(current, target.threshold, &target.url);
    info!("sending {channel} alert");
    if let Err(e) = notifier.notify(ALERT_SUBJECT, &body).await {
        error!(error = ?e, "failed to send {channel}");
        return RunOutcome::NotifyFailed { price: current };
    }
    info!("{channel} sent");

    // ── Persist ───────────────────────────────────────────────────────────────
    let persisted = match store.save(current).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = ?e, "alert sent but last-notified price was not saved");
            false
        }
    };

    RunOutcome::Notified {
        price: current,
        persisted,
    }
}

pub fn alert_body(current: Price, threshold: f64, url: &str) -> String {
    format!(
        "Apartment price alert!\n\n\
         Current quote: {}\n\
         Threshold: {}\n\
         URL: {url}\n",
        format_dollars(current.amount()),
        format_threshold(threshold),
    )
}

fn format_threshold(threshold: f64) -> String {
    if threshold.is_infinite() && threshold > 0.0 {
        "none".into()
    } else {
        format_dollars(threshold)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use error_stack::Report;
    use futures::future::BoxFuture;

    use super::*;
    use crate::config::{Channel, DEFAULT_PRICE_SELECTOR};
    use crate::error::{ExtractionError, NotifyError};

    const URL: &str = "https://example.com/floorplans/b2";

    struct StaticPage(Option<String>);

    impl PageSource for StaticPage {
        fn fetch<'a>(
            &'a self,
            _url: &'a str,
        ) -> BoxFuture<'a, Result<String, Report<ExtractionError>>> {
            Box::pin(async move {
                self.0
                    .clone()
                    .ok_or_else(|| Report::new(ExtractionError::Fetch))
            })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        price: Mutex<Option<Price>>,
        unreadable: bool,
        corrupt: bool,
    }

    impl MemoryStore {
        fn holding(amount: f64) -> Self {
            Self {
                price: Mutex::new(Price::new(amount)),
                ..Self::default()
            }
        }

        fn get(&self) -> Option<Price> {
            *self.price.lock().unwrap()
        }
    }

    impl PriceStore for MemoryStore {
        fn load(&self) -> BoxFuture<'_, Result<Option<Price>, Report<StateError>>> {
            Box::pin(async move {
                if self.unreadable {
                    return Err(Report::new(StateError::Read));
                }
                if self.corrupt {
                    return Err(Report::new(StateError::Parse));
                }
                Ok(self.get())
            })
        }

        fn save(&self, price: Price) -> BoxFuture<'_, Result<(), Report<StateError>>> {
            Box::pin(async move {
                *self.price.lock().unwrap() = Some(price);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn channel(&self) -> Channel {
            Channel::Terminal
        }

        fn notify<'a>(
            &'a self,
            subject: &'a str,
            body: &'a str,
        ) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
            Box::pin(async move {
                if self.fail {
                    return Err(Report::new(NotifyError::Send {
                        channel: "terminal".into(),
                    }));
                }
                self.sent
                    .lock()
                    .unwrap()
                    .push((subject.to_owned(), body.to_owned()));
                Ok(())
            })
        }
    }

    fn target(threshold: f64) -> TargetConfig {
        TargetConfig {
            url: URL.into(),
            threshold,
            selector: DEFAULT_PRICE_SELECTOR.into(),
            request_timeout: Duration::from_secs(15),
        }
    }

    fn listing(price: &str) -> Option<String> {
        Some(format!(
            r#"<html><body><span data-jd-fp-adp="display" class="jd-fp-strong-text">Base Rent {price}</span></body></html>"#
        ))
    }

    async fn run(
        threshold: f64,
        page: Option<String>,
        store: &MemoryStore,
        notifier: &RecordingNotifier,
    ) -> RunOutcome {
        let chain = ExtractorChain::standard(DEFAULT_PRICE_SELECTOR).unwrap();
        run_once(&target(threshold), &StaticPage(page), &chain, store, notifier).await
    }

    fn p(amount: f64) -> Price {
        Price::new(amount).unwrap()
    }

    #[tokio::test]
    async fn first_qualifying_price_notifies_and_persists() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, listing("$2,671"), &store, &notifier).await;

        assert_eq!(
            outcome,
            RunOutcome::Notified {
                price: p(2671.0),
                persisted: true
            }
        );
        assert_eq!(store.get(), Some(p(2671.0)));

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ALERT_SUBJECT);
        assert!(sent[0].1.contains("Current quote: $2,671"));
        assert!(sent[0].1.contains("Threshold: $3,000"));
        assert!(sent[0].1.contains(URL));
    }

    #[tokio::test]
    async fn unchanged_price_is_not_repeated() {
        let store = MemoryStore::holding(2671.0);
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, listing("$2,671"), &store, &notifier).await;

        assert_eq!(
            outcome,
            RunOutcome::Skipped(Decision::NotLower {
                previous: p(2671.0)
            })
        );
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(store.get(), Some(p(2671.0)));
    }

    #[tokio::test]
    async fn lower_price_notifies_again() {
        let store = MemoryStore::holding(2671.0);
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, listing("$2,500"), &store, &notifier).await;

        assert!(matches!(outcome, RunOutcome::Notified { .. }));
        assert_eq!(store.get(), Some(p(2500.0)));
    }

    #[tokio::test]
    async fn price_above_threshold_leaves_state_absent() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let outcome = run(2000.0, listing("$2,671"), &store, &notifier).await;

        assert_eq!(outcome, RunOutcome::Skipped(Decision::AboveThreshold));
        assert_eq!(store.get(), None);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_without_price_ends_run_quietly() {
        let store = MemoryStore::holding(2671.0);
        let notifier = RecordingNotifier::default();

        let outcome = run(
            3000.0,
            Some("<html><body>Contact leasing office</body></html>".into()),
            &store,
            &notifier,
        )
        .await;

        assert_eq!(outcome, RunOutcome::ExtractionFailed);
        assert_eq!(store.get(), Some(p(2671.0)));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_ends_run_quietly() {
        let store = MemoryStore::default();
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, None, &store, &notifier).await;

        assert_eq!(outcome, RunOutcome::ExtractionFailed);
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn failed_notification_does_not_persist() {
        let store = MemoryStore::holding(2671.0);
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };

        let outcome = run(3000.0, listing("$2,400"), &store, &notifier).await;

        assert_eq!(outcome, RunOutcome::NotifyFailed { price: p(2400.0) });
        assert_eq!(store.get(), Some(p(2671.0)));
    }

    #[tokio::test]
    async fn corrupt_state_is_treated_as_never_notified() {
        let store = MemoryStore {
            corrupt: true,
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, listing("$2,671"), &store, &notifier).await;

        assert!(matches!(outcome, RunOutcome::Notified { persisted: true, .. }));
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_state_skips_notification() {
        let store = MemoryStore {
            unreadable: true,
            ..MemoryStore::default()
        };
        let notifier = RecordingNotifier::default();

        let outcome = run(3000.0, listing("$2,671"), &store, &notifier).await;

        assert_eq!(outcome, RunOutcome::StateUnavailable);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn body_without_threshold_says_none() {
        let body = alert_body(p(2671.0), f64::INFINITY, URL);
        assert_eq!(
            body,
            format!("Apartment price alert!\n\nCurrent quote: $2,671\nThreshold: none\nURL: {URL}\n")
        );
    }
}
