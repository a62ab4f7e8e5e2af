pub mod selector;
pub mod text_scan;

use std::sync::LazyLock;

use error_stack::{Report, ResultExt};
use regex::Regex;
use scraper::Html;
use tracing::debug;

use crate::error::{ConfigError, ExtractionError};
use crate::model::Price;
use selector::SelectorExtractor;
use text_scan::TextScanExtractor;

/// `$` then optional whitespace, then digits in comma-separated groups of three.
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*([0-9]{1,3}(?:,[0-9]{3})*)").expect("price pattern is a valid regex")
});

const MAX_REPORTED_TEXT: usize = 80;

/// A way of locating a quoted price in a parsed page.
pub trait PriceExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, page: &Html) -> Result<Price, Report<ExtractionError>>;
}

/// Strategies tried in order; the first one that yields a price wins.
pub struct ExtractorChain {
    strategies: Vec<Box<dyn PriceExtractor>>,
}

impl ExtractorChain {
    pub fn new(strategies: Vec<Box<dyn PriceExtractor>>) -> Self {
        Self { strategies }
    }

    /// Targeted selector first, then a scan of all visible page text.
    pub fn standard(selector: &str) -> Result<Self, Report<ConfigError>> {
        Ok(Self::new(vec![
            Box::new(SelectorExtractor::new(selector)?),
            Box::new(TextScanExtractor),
        ]))
    }

    pub fn extract(&self, html: &str) -> Result<Price, Report<ExtractionError>> {
        let page = Html::parse_document(html);
        let mut failures = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.extract(&page) {
                Ok(price) => {
                    debug!(strategy = strategy.name(), %price, "price extracted");
                    return Ok(price);
                }
                Err(e) => {
                    debug!(
                        strategy = strategy.name(),
                        error = %e.current_context(),
                        "strategy found no price"
                    );
                    failures.push(format!("{}: {}", strategy.name(), e.current_context()));
                }
            }
        }

        let mut report = Report::new(ExtractionError::NoStrategyMatched);
        for failure in failures {
            report = report.attach(failure);
        }
        Err(report)
    }
}

/// Parse the first currency amount in `text`, e.g. `"Base Rent $2,671"` -> 2671.
pub fn parse_price(text: &str) -> Result<Price, Report<ExtractionError>> {
    let captures = PRICE_PATTERN.captures(text).ok_or_else(|| {
        Report::new(ExtractionError::NoPriceMatch {
            text: abbreviate(text),
        })
    })?;

    let digits = captures[1].replace(',', "");
    let amount: f64 = digits
        .parse()
        .change_context(ExtractionError::InvalidPrice {
            raw: digits.clone(),
        })?;

    Price::new(amount).ok_or_else(|| Report::new(ExtractionError::InvalidPrice { raw: digits }))
}

/// Join text fragments and collapse every whitespace run into a single space.
fn normalize_whitespace<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for word in fragments.flat_map(str::split_whitespace) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Trim each fragment and join them with no separator, collapsing whitespace
/// only inside a fragment. Markup such as `$2,<b>671</b>` stays one amount.
fn join_trimmed<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for fragment in fragments {
        for (i, word) in fragment.split_whitespace().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

fn abbreviate(text: &str) -> String {
    match text.char_indices().nth(MAX_REPORTED_TEXT) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    }
}
