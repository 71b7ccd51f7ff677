//! Read-only aggregate views over a set of project analyses.

use crate::core::model::{HealthStatus, ProjectAnalysis};
use serde::Serialize;

pub fn total_market_cap(projects: &[ProjectAnalysis]) -> f64 {
    projects.iter().map(|p| p.market_data.market_cap).sum()
}

/// Arithmetic mean of the MCap/FDV ratios, `None` for an empty slice.
pub fn average_fdv_ratio(projects: &[ProjectAnalysis]) -> Option<f64> {
    if projects.is_empty() {
        return None;
    }
    let sum: f64 = projects.iter().map(|p| p.market_data.mcap_fdv_ratio).sum();
    Some(sum / projects.len() as f64)
}

pub fn total_commits(projects: &[ProjectAnalysis]) -> u64 {
    projects.iter().map(|p| u64::from(p.dev_commits_30d)).sum()
}

fn with_status(projects: &[ProjectAnalysis], status: HealthStatus) -> Vec<&ProjectAnalysis> {
    projects
        .iter()
        .filter(|p| p.health_status == status)
        .collect()
}

pub fn fdv_warnings(projects: &[ProjectAnalysis]) -> Vec<&ProjectAnalysis> {
    with_status(projects, HealthStatus::FdvWarning)
}

pub fn low_activity(projects: &[ProjectAnalysis]) -> Vec<&ProjectAnalysis> {
    with_status(projects, HealthStatus::LowActivity)
}

/// Snapshot of the aggregate views, as rendered and persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_market_cap: f64,
    pub avg_fdv_ratio: f64,
    pub total_commits: u64,
    pub fdv_warnings: usize,
    pub low_activity: usize,
}

impl PortfolioSummary {
    pub fn from_analyses(projects: &[ProjectAnalysis]) -> Self {
        Self {
            total_market_cap: total_market_cap(projects),
            avg_fdv_ratio: average_fdv_ratio(projects).unwrap_or(0.0),
            total_commits: total_commits(projects),
            fdv_warnings: fdv_warnings(projects).len(),
            low_activity: low_activity(projects).len(),
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.fdv_warnings == 0 && self.low_activity == 0
    }
}
