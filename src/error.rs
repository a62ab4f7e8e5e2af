use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("missing required setting: {name}")]
    Missing { name: String },
    #[display("invalid setting: {name}")]
    Invalid { name: String },
    #[display("failed to read env file")]
    EnvFile,
}

#[derive(Debug, Display, Error)]
pub enum ExtractionError {
    #[display("failed to fetch page")]
    Fetch,
    #[display("price element not found with selector {selector}")]
    ElementNotFound { selector: String },
    #[display("could not parse a price from: {text:?}")]
    NoPriceMatch { text: String },
    #[display("price is not a finite non-negative amount: {raw}")]
    InvalidPrice { raw: String },
    #[display("no extraction strategy found a price")]
    NoStrategyMatched,
}

#[derive(Debug, Display, Error)]
pub enum NotifyError {
    #[display("failed to build {channel} notifier")]
    Build { channel: String },
    #[display("failed to send {channel} notification")]
    Send { channel: String },
}

#[derive(Debug, Display, Error)]
pub enum StateError {
    #[display("failed to read state file")]
    Read,
    #[display("failed to write state file")]
    Write,
    #[display("state file does not hold a price")]
    Parse,
}
