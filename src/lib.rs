pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::analyze::AnalyzeOptions;
use crate::core::config::AppConfig;
use crate::providers::{DefiLlamaProvider, GithubProvider};
use anyhow::{Result, bail};
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Analyze {
        dca_amount: Option<f64>,
        output_dir: Option<PathBuf>,
    },
    Validate,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cryptodca starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(projects = config.projects.len(), "Loaded config");

    match command {
        AppCommand::Analyze {
            dca_amount,
            output_dir,
        } => {
            if let Some(amount) = dca_amount
                && !(amount.is_finite() && amount >= 0.0)
            {
                bail!("DCA amount must be a non-negative number, got {amount}");
            }

            let settings = &config.settings;
            let market_provider =
                DefiLlamaProvider::new(config.providers.defillama_base_url(), settings)?;
            let token = config.providers.github_token();
            let activity_provider = GithubProvider::new(
                config.providers.github_base_url(),
                token.as_deref(),
                settings,
            )?;

            let options = AnalyzeOptions {
                dca_amount,
                output_dir,
            };
            cli::analyze::run(&config, &market_provider, &activity_provider, &options).await?;
            Ok(())
        }
        AppCommand::Validate => {
            cli::validate::run(&config);
            Ok(())
        }
    }
}
