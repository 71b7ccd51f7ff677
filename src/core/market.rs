//! Data-source abstractions for valuation and developer activity.

use crate::core::model::MarketData;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Valuation snapshot for the project identified by `slug`, reported
    /// under `ticker`.
    async fn fetch_market_data(&self, ticker: &str, slug: &str) -> Result<MarketData>;
}

#[async_trait]
pub trait ActivityProvider: Send + Sync {
    /// Commits to `repo` over the last `days` days. Failures count as zero.
    async fn commit_count(&self, repo: &str, days: u32) -> u32;
}
