use crate::core::health::{DEFAULT_MIN_COMMITS, HealthThresholds};
use crate::core::model::{ProjectConfig, ValidationError};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Tolerance on the sum of target allocations.
const ALLOCATION_TOLERANCE: f64 = 0.01;

/// Tunables for classification, activity lookback and HTTP behaviour.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub fdv_ratio_warning_threshold: f64,
    pub fdv_ratio_target_min: f64,
    pub fdv_ratio_target_max: f64,
    pub min_commits: u32,
    pub dev_activity_lookback_days: u32,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let thresholds = HealthThresholds::default();
        Self {
            fdv_ratio_warning_threshold: thresholds.warning,
            fdv_ratio_target_min: thresholds.target_min,
            fdv_ratio_target_max: thresholds.target_max,
            min_commits: DEFAULT_MIN_COMMITS,
            dev_activity_lookback_days: 30,
            http_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl AnalysisSettings {
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            warning: self.fdv_ratio_warning_threshold,
            target_min: self.fdv_ratio_target_min,
            target_max: self.fdv_ratio_target_max,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let t = self.thresholds();
        if !(t.warning <= t.target_min && t.target_min <= t.target_max) {
            return Err(ValidationError::ThresholdOrder {
                warning: t.warning,
                target_min: t.target_min,
                target_max: t.target_max,
            });
        }
        if self.dev_activity_lookback_days == 0 {
            return Err(ValidationError::NotPositive {
                field: "dev_activity_lookback_days",
            });
        }
        if self.max_retries == 0 {
            return Err(ValidationError::NotPositive {
                field: "max_retries",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DefiLlamaProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GithubProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub defillama: Option<DefiLlamaProviderConfig>,
    pub github: Option<GithubProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            defillama: Some(DefiLlamaProviderConfig {
                base_url: "https://api.llama.fi".to_string(),
            }),
            github: Some(GithubProviderConfig {
                base_url: "https://api.github.com".to_string(),
                token: None,
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn defillama_base_url(&self) -> &str {
        self.defillama
            .as_ref()
            .map_or("https://api.llama.fi", |p| &p.base_url)
    }

    pub fn github_base_url(&self) -> &str {
        self.github
            .as_ref()
            .map_or("https://api.github.com", |p| &p.base_url)
    }

    /// Token from the config file, else from the `GITHUB_TOKEN` environment variable.
    pub fn github_token(&self) -> Option<String> {
        resolve_token(
            self.github.as_ref().and_then(|g| g.token.clone()),
            std::env::var(GITHUB_TOKEN_ENV).ok(),
        )
    }
}

fn resolve_token(configured: Option<String>, env: Option<String>) -> Option<String> {
    let non_blank = |t: String| {
        let t = t.trim().to_string();
        (!t.is_empty()).then_some(t)
    };
    configured.and_then(non_blank).or_else(|| env.and_then(non_blank))
}

fn uppercase_keys<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, f64>::deserialize(deserializer)?;
    let mut holdings = HashMap::with_capacity(raw.len());
    for (ticker, value) in raw {
        let ticker = ticker.trim().to_uppercase();
        if holdings.contains_key(&ticker) {
            return Err(D::Error::custom(format!("Duplicate holding ticker: {ticker}")));
        }
        holdings.insert(ticker, value);
    }
    Ok(holdings)
}

/// Current holdings (USD value per ticker) and the new capital to deploy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PortfolioConfig {
    pub dca_amount: f64,
    #[serde(deserialize_with = "uppercase_keys")]
    pub holdings: HashMap<String, f64>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            dca_amount: 1000.0,
            holdings: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub projects: Vec<ProjectConfig>,
    #[serde(default)]
    pub settings: AnalysisSettings,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    pub output_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "cryptodca", "cryptodca")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or("."))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Configuration file not found or unreadable: {}",
                path.as_ref().display()
            )
        })?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;
        debug!(projects = config.projects.len(), "Successfully loaded config");
        Ok(config)
    }

    /// Checks the cross-project invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.projects.is_empty() {
            return Err(ValidationError::NoProjects);
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            if !seen.insert(project.ticker.as_str()) {
                return Err(ValidationError::DuplicateTicker(project.ticker.clone()));
            }
        }

        let total_allocation: f64 = self.projects.iter().map(|p| p.target_allocation).sum();
        if (total_allocation - 1.0).abs() > ALLOCATION_TOLERANCE {
            return Err(ValidationError::AllocationSum(total_allocation));
        }

        self.settings.validate()?;

        if !(self.portfolio.dca_amount.is_finite() && self.portfolio.dca_amount >= 0.0) {
            return Err(ValidationError::NegativeValue {
                ticker: "portfolio".to_string(),
                field: "dca_amount",
                value: self.portfolio.dca_amount,
            });
        }
        for (ticker, value) in &self.portfolio.holdings {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(ValidationError::NegativeValue {
                    ticker: ticker.clone(),
                    field: "holding",
                    value: *value,
                });
            }
        }

        Ok(())
    }
}
