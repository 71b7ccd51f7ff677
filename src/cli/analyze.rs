use super::{report, ui};
use crate::core::config::{AnalysisSettings, AppConfig};
use crate::core::model::{ProjectAnalysis, ProjectConfig};
use crate::core::{
    ActivityProvider, MarketDataProvider, PortfolioSummary, Rebalancer, Recommendation, summary,
};
use anyhow::{Result, bail};
use futures::future::join_all;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub dca_amount: Option<f64>,
    pub output_dir: Option<PathBuf>,
}

/// Fetches data for one project and builds its analysis. A market-data
/// failure drops the project; activity failures count as zero commits.
async fn analyze_project(
    project: &ProjectConfig,
    market_provider: &dyn MarketDataProvider,
    activity_provider: &dyn ActivityProvider,
    settings: &AnalysisSettings,
) -> Option<ProjectAnalysis> {
    info!(ticker = %project.ticker, "Analyzing project");

    let market_data = match market_provider
        .fetch_market_data(&project.ticker, &project.defillama_slug)
        .await
    {
        Ok(md) => md,
        Err(e) => {
            error!(ticker = %project.ticker, error = %e, "Project analysis failed");
            return None;
        }
    };

    let commit_futures = project.github_repos.iter().map(|repo| {
        activity_provider.commit_count(repo, settings.dev_activity_lookback_days)
    });
    let total_commits = join_all(commit_futures)
        .await
        .into_iter()
        .fold(0u32, u32::saturating_add);

    let analysis =
        ProjectAnalysis::new(project.clone(), market_data, total_commits).with_health(settings);

    info!(
        ticker = %project.ticker,
        health_status = ?analysis.health_status,
        fdv_ratio = analysis.market_data.mcap_fdv_ratio,
        commits = total_commits,
        "Project analyzed"
    );
    Some(analysis)
}

/// Analyzes every project concurrently, keeping those that succeeded in
/// configuration order.
pub async fn analyze_projects(
    projects: &[ProjectConfig],
    market_provider: &dyn MarketDataProvider,
    activity_provider: &dyn ActivityProvider,
    settings: &AnalysisSettings,
) -> Vec<ProjectAnalysis> {
    let pb = ui::new_progress_bar(projects.len() as u64, true);
    pb.set_message("Fetching market data...");

    let futures = projects.iter().map(|project| {
        let pb_clone = pb.clone();
        async move {
            let result =
                analyze_project(project, market_provider, activity_provider, settings).await;
            pb_clone.inc(1);
            result
        }
    });

    let analyses: Vec<ProjectAnalysis> = join_all(futures).await.into_iter().flatten().collect();
    pb.finish_and_clear();
    analyses
}

/// Holdings restricted to the analyzed tickers.
fn holdings_for(
    analyses: &[ProjectAnalysis],
    configured: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    analyses
        .iter()
        .map(|p| {
            let ticker = p.ticker().to_string();
            let value = configured.get(&ticker).copied().unwrap_or(0.0);
            (ticker, value)
        })
        .collect()
}

/// Outcome of a full analysis run.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub analyses: Vec<ProjectAnalysis>,
    pub recommendations: Vec<Recommendation>,
    pub report_path: PathBuf,
}

pub async fn run(
    config: &AppConfig,
    market_provider: &dyn MarketDataProvider,
    activity_provider: &dyn ActivityProvider,
    options: &AnalyzeOptions,
) -> Result<AnalysisOutcome> {
    let analyses = analyze_projects(
        &config.projects,
        market_provider,
        activity_provider,
        &config.settings,
    )
    .await;

    if analyses.is_empty() {
        error!("No projects analyzed");
        bail!("Failed to analyze any projects");
    }

    if analyses.len() < config.projects.len() {
        warn!(
            analyzed = analyses.len(),
            total = config.projects.len(),
            "Partial analysis"
        );
    }

    print_portfolio_analysis(&analyses, &config.settings);
    print_summary_stats(&analyses);

    let dca_amount = options.dca_amount.unwrap_or(config.portfolio.dca_amount);
    let holdings = holdings_for(&analyses, &config.portfolio.holdings);
    let rebalancer = Rebalancer::new(holdings, dca_amount);
    let raw = rebalancer.recommend(&analyses);
    let recommendations = Rebalancer::format(&raw, &analyses);

    print_rebalance_recommendations(&recommendations);

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_path());
    let report_path = report::write_analysis_json(&analyses, &recommendations, &output_dir)?;
    println!("📊 Analysis saved to: {}", report_path.display());

    info!(projects_analyzed = analyses.len(), "Analysis completed");

    Ok(AnalysisOutcome {
        analyses,
        recommendations,
        report_path,
    })
}

fn print_portfolio_analysis(projects: &[ProjectAnalysis], settings: &AnalysisSettings) {
    let thresholds = settings.thresholds();
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Price ($)"),
        ui::header_cell("MCap/FDV"),
        ui::header_cell("Dev Activity"),
        ui::header_cell("Health"),
    ]);

    for project in projects {
        let ratio = project.market_data.mcap_fdv_ratio;
        let ratio_text = if project.market_data.fdv.is_estimated() {
            ui::ratio_cell(ratio, thresholds.status(ratio))
                .add_attribute(comfy_table::Attribute::Italic)
        } else {
            ui::ratio_cell(ratio, thresholds.status(ratio))
        };
        table.add_row(vec![
            comfy_table::Cell::new(project.ticker()),
            ui::number_cell(ui::format_usd(project.market_data.price, 2)),
            ratio_text,
            ui::number_cell(project.dev_commits_30d.to_string()),
            ui::health_cell(project.health_status),
        ]);
    }

    println!("\n{}\n", ui::style_text("Crypto Portfolio Analysis", ui::StyleType::Title));
    println!("{table}");
    if projects.iter().any(|p| p.market_data.fdv.is_estimated()) {
        println!(
            "{}",
            ui::style_text(
                "Italic ratios use an estimated FDV (1.5x market cap)",
                ui::StyleType::Subtle
            )
        );
    }
    println!();
}

fn print_summary_stats(projects: &[ProjectAnalysis]) {
    let stats = PortfolioSummary::from_analyses(projects);

    println!("{}", ui::style_text("Portfolio Summary", ui::StyleType::TotalLabel));
    println!(
        "  Total Market Cap: {}",
        ui::format_usd(stats.total_market_cap, 0)
    );
    println!(
        "  Average MCap/FDV Ratio: {:.1}%",
        stats.avg_fdv_ratio * 100.0
    );
    println!("  Total Commits (30d): {}", stats.total_commits);

    if stats.fdv_warnings > 0 {
        let tickers: Vec<_> = summary::fdv_warnings(projects)
            .into_iter()
            .map(|p| p.ticker())
            .collect();
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "  ⚠️  FDV Warnings: {} project(s) ({})",
                    stats.fdv_warnings,
                    tickers.join(", ")
                ),
                ui::StyleType::Warning
            )
        );
    }
    if stats.low_activity > 0 {
        let tickers: Vec<_> = summary::low_activity(projects)
            .into_iter()
            .map(|p| p.ticker())
            .collect();
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "  ⚠️  Low Activity: {} project(s) ({})",
                    stats.low_activity,
                    tickers.join(", ")
                ),
                ui::StyleType::Warning
            )
        );
    }
    if stats.all_healthy() {
        println!(
            "{}",
            ui::style_text("  ✅ All projects healthy", ui::StyleType::Success)
        );
    }

    ui::print_separator();
}

fn print_rebalance_recommendations(recommendations: &[Recommendation]) {
    if recommendations.is_empty() {
        println!(
            "\n{}\n",
            ui::style_text(
                "✓ Portfolio is balanced - no purchases needed",
                ui::StyleType::Success
            )
        );
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Amount (USD)"),
        ui::header_cell("Price ($)"),
        ui::header_cell("Quantity"),
    ]);

    for rec in recommendations {
        table.add_row(vec![
            comfy_table::Cell::new(&rec.ticker),
            ui::number_cell(ui::format_usd(rec.amount_usd, 2)),
            ui::number_cell(ui::format_usd(rec.current_price, 2)),
            ui::number_cell(format!("{:.8}", rec.quantity)),
        ]);
    }

    println!("\n{}\n", ui::style_text("Rebalancing Recommendations", ui::StyleType::Title));
    println!("{table}\n");
}
