use crate::model::Price;

/// Why a run did or did not notify.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Current price is above the configured threshold.
    AboveThreshold,
    /// No notification has ever been sent.
    FirstAlert,
    /// Cheaper than the last price we alerted on.
    PriceDropped { previous: Price },
    /// Same as or higher than the last price we alerted on.
    NotLower { previous: Price },
}

impl Decision {
    pub fn should_notify(self) -> bool {
        matches!(self, Self::FirstAlert | Self::PriceDropped { .. })
    }
}

/// Classify the current price against the threshold and notification history.
///
/// The threshold is inclusive (a price equal to it still qualifies) while an
/// improvement must be strictly lower than the last notified price.
pub fn evaluate(current: Price, threshold: f64, last_notified: Option<Price>) -> Decision {
    if current.amount() > threshold {
        return Decision::AboveThreshold;
    }

    match last_notified {
        None => Decision::FirstAlert,
        Some(previous) if current.amount() < previous.amount() => {
            Decision::PriceDropped { previous }
        }
        Some(previous) => Decision::NotLower { previous },
    }
}

pub fn should_notify(current: Price, threshold: f64, last_notified: Option<Price>) -> bool {
    evaluate(current, threshold, last_notified).should_notify()
}
