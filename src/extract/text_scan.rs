use error_stack::Report;
use scraper::Html;

use crate::error::ExtractionError;
use crate::extract::{PriceExtractor, normalize_whitespace, parse_price};
use crate::model::Price;

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Fallback: first currency amount anywhere in the page's visible text.
pub struct TextScanExtractor;

impl PriceExtractor for TextScanExtractor {
    fn name(&self) -> &'static str {
        "text-scan"
    }

    fn extract(&self, page: &Html) -> Result<Price, Report<ExtractionError>> {
        parse_price(&visible_text(page))
    }
}

fn visible_text(page: &Html) -> String {
    let fragments = page.tree.root().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        (!hidden).then_some(&**text)
    });
    normalize_whitespace(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> Result<Price, Report<ExtractionError>> {
        TextScanExtractor.extract(&Html::parse_document(html))
    }

    #[test]
    fn finds_first_amount_in_body() {
        let html = "<html><body><h2>Plan A</h2><p>Starting at\n   $1,950</p><p>$2,100</p></body></html>";
        assert_eq!(scan(html).unwrap().amount(), 1950.0);
    }

    #[test]
    fn skips_script_and_style_text() {
        let html = r#"<html><head>
            <style>.x::after { content: "$9"; }</style>
            <script>var fee = "$5";</script>
          </head><body><div>Rent $2,200</div></body></html>"#;
        assert_eq!(scan(html).unwrap().amount(), 2200.0);
    }

    #[test]
    fn visible_text_is_whitespace_normalised() {
        let page = Html::parse_document("<p>Base\n\n Rent</p><p>  $2,671 </p>");
        assert_eq!(visible_text(&page), "Base Rent $2,671");
    }

    #[test]
    fn page_without_amount_fails() {
        let err = scan("<html><body>Waitlist only</body></html>").unwrap_err();
        assert!(matches!(
            err.current_context(),
            ExtractionError::NoPriceMatch { .. }
        ));
    }
}
