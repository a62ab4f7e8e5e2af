pub mod file;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::StateError;
use crate::model::Price;

/// Persistence for the last price a notification was sent for.
pub trait PriceStore: Send + Sync {
    /// `Ok(None)` when nothing has been notified yet.
    fn load(&self) -> BoxFuture<'_, Result<Option<Price>, Report<StateError>>>;

    /// Overwrite the stored price.
    fn save(&self, price: Price) -> BoxFuture<'_, Result<(), Report<StateError>>>;
}
