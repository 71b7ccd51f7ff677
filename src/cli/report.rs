//! Dated JSON report of a run.

use crate::core::model::{Category, FdvHealth, HealthStatus, ProjectAnalysis};
use crate::core::{PortfolioSummary, Recommendation};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct MarketDataReport {
    pub price: f64,
    pub market_cap: f64,
    pub fdv: f64,
    pub mcap_fdv_ratio: f64,
    pub fdv_estimated: bool,
}

#[derive(Debug, Serialize)]
pub struct ProjectReport<'a> {
    pub ticker: &'a str,
    pub name: &'a str,
    pub category: Category,
    pub market_data: MarketDataReport,
    pub dev_commits_30d: u32,
    pub health_status: HealthStatus,
    pub fdv_health: Option<&'a FdvHealth>,
}

impl<'a> From<&'a ProjectAnalysis> for ProjectReport<'a> {
    fn from(p: &'a ProjectAnalysis) -> Self {
        ProjectReport {
            ticker: &p.project.ticker,
            name: &p.project.name,
            category: p.project.category,
            market_data: MarketDataReport {
                price: p.market_data.price,
                market_cap: p.market_data.market_cap,
                fdv: p.market_data.fdv.value(),
                mcap_fdv_ratio: p.market_data.mcap_fdv_ratio,
                fdv_estimated: p.market_data.fdv.is_estimated(),
            },
            dev_commits_30d: p.dev_commits_30d,
            health_status: p.health_status,
            fdv_health: p.fdv_health.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub timestamp: String,
    pub projects: Vec<ProjectReport<'a>>,
    pub rebalance_recommendations: &'a [Recommendation],
    pub summary: PortfolioSummary,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(
        timestamp: DateTime<Utc>,
        projects: &'a [ProjectAnalysis],
        recommendations: &'a [Recommendation],
    ) -> Self {
        Self {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            projects: projects.iter().map(ProjectReport::from).collect(),
            rebalance_recommendations: recommendations,
            summary: PortfolioSummary::from_analyses(projects),
        }
    }
}

/// Report file name for the given run time.
pub fn report_file_name(timestamp: &DateTime<Utc>) -> String {
    format!("analysis_{}.json", timestamp.format("%Y-%m-%d"))
}

/// Writes the report into `output_dir`, creating it if needed, and returns the file path.
pub fn write_analysis_json(
    projects: &[ProjectAnalysis],
    recommendations: &[Recommendation],
    output_dir: &Path,
) -> Result<PathBuf> {
    let timestamp = Utc::now();
    let output_path = output_dir.join(report_file_name(&timestamp));

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let report = AnalysisReport::new(timestamp, projects, recommendations);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    fs::write(&output_path, &json)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    info!(
        path = %output_path.display(),
        size = json.len(),
        "Analysis JSON written"
    );
    Ok(output_path)
}
