//! Watches an apartment listing for its quoted rent and sends an email or SMS
//! alert when the price falls to or below a threshold and is lower than the
//! last price alerted on.

pub mod config;
pub mod decision;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod monitor;
pub mod notifier;
pub mod storage;
