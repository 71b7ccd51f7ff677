//! Dilution-risk classification and overall project health.

use crate::core::model::{FdvHealth, FdvStatus, HealthStatus, MarketData, Severity};
use tracing::info;

/// Minimum commits in the lookback window before a project is flagged.
pub const DEFAULT_MIN_COMMITS: u32 = 10;

/// Ratio boundaries for the four dilution tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub warning: f64,
    pub target_min: f64,
    pub target_max: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            warning: 0.40,
            target_min: 0.45,
            target_max: 0.50,
        }
    }
}

impl HealthThresholds {
    /// Tier of `ratio`, first match wins.
    pub fn status(&self, ratio: f64) -> FdvStatus {
        if ratio < self.warning {
            FdvStatus::Warning
        } else if ratio < self.target_min {
            FdvStatus::Caution
        } else if ratio <= self.target_max {
            FdvStatus::Healthy
        } else {
            FdvStatus::Excellent
        }
    }
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Maps a market-cap/FDV ratio to its tier, severity and message.
pub fn classify(ratio: f64, thresholds: &HealthThresholds) -> FdvHealth {
    let status = thresholds.status(ratio);
    let (severity, message) = match status {
        FdvStatus::Warning => (
            Severity::High,
            format!("High dilution risk: MCap is only {} of FDV", pct(ratio)),
        ),
        FdvStatus::Caution => (
            Severity::Medium,
            format!(
                "Below target range: {} < {}",
                pct(ratio),
                pct(thresholds.target_min)
            ),
        ),
        FdvStatus::Healthy => (
            Severity::Low,
            format!("Within target range: {}", pct(ratio)),
        ),
        FdvStatus::Excellent => (Severity::Low, format!("Minimal dilution: {}", pct(ratio))),
    };

    FdvHealth {
        status,
        message,
        severity,
        ratio,
    }
}

/// Classifies a project's market data and records the outcome.
pub fn analyze_fdv_health(market_data: &MarketData, thresholds: &HealthThresholds) -> FdvHealth {
    let health = classify(market_data.mcap_fdv_ratio, thresholds);
    info!(
        ticker = %market_data.ticker,
        ratio = health.ratio,
        status = ?health.status,
        severity = ?health.severity,
        "FDV health analyzed"
    );
    health
}

/// Overall health tag. Dilution risk takes priority over low activity.
pub fn aggregate(
    ratio: f64,
    warning_threshold: f64,
    commits_30d: u32,
    min_commits: u32,
) -> HealthStatus {
    if ratio < warning_threshold {
        HealthStatus::FdvWarning
    } else if commits_30d < min_commits {
        HealthStatus::LowActivity
    } else {
        HealthStatus::Ok
    }
}
