//! Domain records shared by the analysis engine, providers and output sinks.
//!
//! Every record with a range or normalization invariant is built through a
//! constructor that returns [`ValidationError`] instead of letting an invalid
//! value exist.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

use crate::core::config::AnalysisSettings;
use crate::core::health;

/// Multiplier used to infer a fully diluted valuation when a source omits it.
pub const FDV_ESTIMATE_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Ticker must not be empty")]
    EmptyTicker,
    #[error("Target allocation for {ticker} must be within 0.0-1.0, got {value}")]
    AllocationOutOfRange { ticker: String, value: f64 },
    #[error("Invalid GitHub repo format: {0}. Expected 'owner/repo'")]
    InvalidRepo(String),
    #[error("{field} for {ticker} must be a non-negative number, got {value}")]
    NegativeValue {
        ticker: String,
        field: &'static str,
        value: f64,
    },
    #[error("MCap/FDV ratio for {ticker} must be within 0.0-1.0, got {value}")]
    RatioOutOfRange { ticker: String, value: f64 },
    #[error("No projects defined")]
    NoProjects,
    #[error("Duplicate ticker in project list: {0}")]
    DuplicateTicker(String),
    #[error("Total target allocation is {0:.2}, but should sum to 1.0 (100%)")]
    AllocationSum(f64),
    #[error(
        "FDV thresholds must satisfy warning <= target_min <= target_max, got {warning} / {target_min} / {target_max}"
    )]
    ThresholdOrder {
        warning: f64,
        target_min: f64,
        target_max: f64,
    },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

fn normalize_ticker(ticker: &str) -> Result<String, ValidationError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ValidationError::EmptyTicker);
    }
    Ok(ticker)
}

fn non_negative(ticker: &str, field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NegativeValue {
            ticker: ticker.to_string(),
            field,
            value,
        })
    }
}

/// Investment bucket a project belongs to. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Core,
    Midcap,
    Experimental,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Category::Core => "core",
                Category::Midcap => "midcap",
                Category::Experimental => "experimental",
            }
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawProjectConfig {
    ticker: String,
    name: String,
    defillama_slug: String,
    #[serde(default)]
    github_repos: Vec<String>,
    category: Category,
    target_allocation: f64,
}

/// A configured project and its target weight in the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProjectConfig")]
pub struct ProjectConfig {
    pub ticker: String,
    pub name: String,
    pub defillama_slug: String,
    pub github_repos: Vec<String>,
    pub category: Category,
    pub target_allocation: f64,
}

impl ProjectConfig {
    pub fn new(
        ticker: &str,
        name: &str,
        defillama_slug: &str,
        github_repos: Vec<String>,
        category: Category,
        target_allocation: f64,
    ) -> Result<Self, ValidationError> {
        let ticker = normalize_ticker(ticker)?;

        if !(0.0..=1.0).contains(&target_allocation) {
            return Err(ValidationError::AllocationOutOfRange {
                ticker,
                value: target_allocation,
            });
        }

        for repo in &github_repos {
            let mut parts = repo.split('/');
            let valid = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(owner), Some(repo_name), None) if !owner.is_empty() && !repo_name.is_empty()
            );
            if !valid {
                return Err(ValidationError::InvalidRepo(repo.clone()));
            }
        }

        Ok(Self {
            ticker,
            name: name.to_string(),
            defillama_slug: defillama_slug.to_string(),
            github_repos,
            category,
            target_allocation,
        })
    }
}

impl TryFrom<RawProjectConfig> for ProjectConfig {
    type Error = ValidationError;

    fn try_from(raw: RawProjectConfig) -> Result<Self, Self::Error> {
        ProjectConfig::new(
            &raw.ticker,
            &raw.name,
            &raw.defillama_slug,
            raw.github_repos,
            raw.category,
            raw.target_allocation,
        )
    }
}

/// A fully diluted valuation, tagged with whether the source reported it or
/// it was inferred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fdv {
    Exact(f64),
    Estimated(f64),
}

impl Fdv {
    /// Infers the valuation from market cap when the source has none.
    pub fn estimate_from(market_cap: f64) -> Self {
        Fdv::Estimated(market_cap * FDV_ESTIMATE_MULTIPLIER)
    }

    pub fn value(&self) -> f64 {
        match self {
            Fdv::Exact(v) | Fdv::Estimated(v) => *v,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Fdv::Estimated(_))
    }
}

/// Valuation snapshot of a single project.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub ticker: String,
    pub price: f64,
    pub market_cap: f64,
    pub fdv: Fdv,
    pub mcap_fdv_ratio: f64,
}

impl MarketData {
    /// Builds a snapshot, deriving the ratio when `ratio` is `None`.
    ///
    /// A derived ratio is `market_cap / fdv` clamped to 1.0, and 0 when the
    /// FDV is zero. A supplied ratio must already lie within 0.0-1.0.
    pub fn new(
        ticker: &str,
        price: f64,
        market_cap: f64,
        fdv: Fdv,
        ratio: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let ticker = normalize_ticker(ticker)?;
        let price = non_negative(&ticker, "price", price)?;
        let market_cap = non_negative(&ticker, "market_cap", market_cap)?;
        non_negative(&ticker, "fdv", fdv.value())?;

        let mcap_fdv_ratio = match ratio {
            Some(r) if (0.0..=1.0).contains(&r) => r,
            Some(r) => {
                return Err(ValidationError::RatioOutOfRange { ticker, value: r });
            }
            None if fdv.value() == 0.0 => 0.0,
            None => (market_cap / fdv.value()).min(1.0),
        };

        Ok(Self {
            ticker,
            price,
            market_cap,
            fdv,
            mcap_fdv_ratio,
        })
    }
}

/// Dilution-risk tier of a market-cap/FDV ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FdvStatus {
    Warning,
    Caution,
    Healthy,
    Excellent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Overall health tag of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Ok,
    FdvWarning,
    LowActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdvHealth {
    pub status: FdvStatus,
    pub message: String,
    pub severity: Severity,
    pub ratio: f64,
}

/// Per-run analysis of one project.
#[derive(Debug, Clone)]
pub struct ProjectAnalysis {
    pub project: ProjectConfig,
    pub market_data: MarketData,
    pub dev_commits_30d: u32,
    /// Change in commit activity against the previous window, when known.
    pub dev_activity_change: Option<f64>,
    pub health_status: HealthStatus,
    pub fdv_health: Option<FdvHealth>,
}

impl ProjectAnalysis {
    pub fn new(project: ProjectConfig, market_data: MarketData, dev_commits_30d: u32) -> Self {
        Self {
            project,
            market_data,
            dev_commits_30d,
            dev_activity_change: None,
            health_status: HealthStatus::Ok,
            fdv_health: None,
        }
    }

    /// Classifies the valuation and sets the overall health tag.
    pub fn with_health(mut self, settings: &AnalysisSettings) -> Self {
        self.fdv_health = Some(health::analyze_fdv_health(
            &self.market_data,
            &settings.thresholds(),
        ));
        self.health_status = health::aggregate(
            self.market_data.mcap_fdv_ratio,
            settings.fdv_ratio_warning_threshold,
            self.dev_commits_30d,
            settings.min_commits,
        );
        self
    }

    pub fn ticker(&self) -> &str {
        &self.project.ticker
    }
}
