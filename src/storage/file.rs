use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;

use crate::error::StateError;
use crate::model::Price;
use crate::storage::PriceStore;

/// Stores the price as its decimal string in a single plain-text file.
pub struct FilePriceStore {
    path: PathBuf,
}

impl FilePriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PriceStore for FilePriceStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<Price>, Report<StateError>>> {
        Box::pin(async move {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(Report::new(e)
                        .change_context(StateError::Read)
                        .attach(format!("path: {}", self.path.display())));
                }
            };

            let raw = content.trim();
            let amount: f64 = raw
                .parse()
                .change_context(StateError::Parse)
                .attach_with(|| format!("content: {raw:?}"))?;

            Price::new(amount)
                .map(Some)
                .ok_or_else(|| Report::new(StateError::Parse).attach(format!("content: {raw:?}")))
        })
    }

    fn save(&self, price: Price) -> BoxFuture<'_, Result<(), Report<StateError>>> {
        Box::pin(async move {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .change_context(StateError::Write)
                    .attach_with(|| format!("cannot create state directory: {}", parent.display()))?;
            }

            // Readers only ever see a complete price.
            let tmp = self.path.with_extension("tmp");
            tokio::fs::write(&tmp, price.to_string())
                .await
                .change_context(StateError::Write)
                .attach_with(|| format!("path: {}", tmp.display()))?;
            tokio::fs::rename(&tmp, &self.path)
                .await
                .change_context(StateError::Write)
                .attach_with(|| format!("path: {}", self.path.display()))?;

            Ok(())
        })
    }
}
