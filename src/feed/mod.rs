//! Outcome feed integrations.
//!
//! Defines the `OutcomeFeed` trait (the abstract data source the engine
//! polls) and provides an HTTP implementation for the public
//! recent-games endpoint. Normalization of the raw records lives in
//! [`normalizer`].

pub mod http;
pub mod normalizer;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One loosely-typed record as returned by a feed.
pub type RawRecord = Value;

/// Abstraction over outcome sources.
///
/// Implementors return the most recent game records, most recent first.
/// Transport, retries and fallbacks are the implementor's business; the
/// engine calls `fetch_recent` once per cycle and never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeFeed: Send + Sync {
    /// Fetch the latest records, most recent first.
    async fn fetch_recent(&self) -> Result<Vec<RawRecord>>;

    /// Feed name for logging and identification.
    fn name(&self) -> &str;
}
