//! Domain types and the pure analysis engine

pub mod config;
pub mod health;
pub mod log;
pub mod market;
pub mod model;
pub mod rebalance;
pub mod summary;

// Re-export main types for cleaner imports
pub use market::{ActivityProvider, MarketDataProvider};
pub use model::{FdvHealth, HealthStatus, MarketData, ProjectAnalysis, ProjectConfig};
pub use rebalance::{Rebalancer, Recommendation};
pub use summary::PortfolioSummary;
