use error_stack::Report;
use scraper::{Html, Selector};

use crate::error::{ConfigError, ExtractionError};
use crate::extract::{PriceExtractor, join_trimmed, parse_price};
use crate::model::Price;

/// Reads the price from the first element matching a CSS selector.
pub struct SelectorExtractor {
    selector: Selector,
    source: String,
}

impl SelectorExtractor {
    pub fn new(selector: &str) -> Result<Self, Report<ConfigError>> {
        let parsed = Selector::parse(selector).map_err(|e| {
            Report::new(ConfigError::Invalid {
                name: "PRICE_SELECTOR".into(),
            })
            .attach(format!("selector {selector:?}: {e:?}"))
        })?;

        Ok(Self {
            selector: parsed,
            source: selector.to_owned(),
        })
    }
}

impl PriceExtractor for SelectorExtractor {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn extract(&self, page: &Html) -> Result<Price, Report<ExtractionError>> {
        let text = page
            .select(&self.selector)
            .next()
            .map(|element| join_trimmed(element.text()))
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                Report::new(ExtractionError::ElementNotFound {
                    selector: self.source.clone(),
                })
            })?;

        parse_price(&text)
    }
}
