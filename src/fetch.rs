use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::ExtractionError;

/// Something that can produce the HTML of the watched page.
pub trait PageSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, Report<ExtractionError>>>;
}

pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    /// `timeout` bounds the whole request, body included.
    pub fn new(timeout: Duration) -> Result<Self, Report<ExtractionError>> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .change_context(ExtractionError::Fetch)
            .attach("failed to build HTTP client")?;

        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, Report<ExtractionError>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .change_context(ExtractionError::Fetch)
                .attach_with(|| format!("url: {url}"))?;

            if !response.status().is_success() {
                return Err(Report::new(ExtractionError::Fetch)
                    .attach(format!("HTTP status: {}", response.status()))
                    .attach(format!("url: {url}")));
            }

            let body = response
                .text()
                .await
                .change_context(ExtractionError::Fetch)
                .attach_with(|| format!("url: {url}"))?;

            debug!(url, bytes = body.len(), "page fetched");
            Ok(body)
        })
    }
}
