use super::ui;
use crate::core::config::AppConfig;
use comfy_table::Cell;

/// Prints the configured projects and their target weights.
pub fn run(config: &AppConfig) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Name"),
        ui::header_cell("Category"),
        ui::header_cell("DeFiLlama"),
        ui::header_cell("Repos"),
        ui::header_cell("Target"),
    ]);

    for project in &config.projects {
        let repos = if project.github_repos.is_empty() {
            "-".to_string()
        } else {
            project.github_repos.join("\n")
        };
        table.add_row(vec![
            Cell::new(&project.ticker),
            Cell::new(&project.name),
            Cell::new(project.category),
            Cell::new(&project.defillama_slug),
            Cell::new(repos),
            ui::number_cell(format!("{:.1}%", project.target_allocation * 100.0)),
        ]);
    }

    let total: f64 = config.projects.iter().map(|p| p.target_allocation).sum();
    table.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        ui::number_cell(format!("{:.1}%", total * 100.0)),
    ]);

    println!("\n{}\n", ui::style_text("Configured Projects", ui::StyleType::Title));
    println!("{table}");

    let settings = &config.settings;
    println!(
        "{}",
        ui::style_text(
            &format!(
                "FDV ratio warning < {:.0}%, target {:.0}%-{:.0}%, min {} commits over {} days",
                settings.fdv_ratio_warning_threshold * 100.0,
                settings.fdv_ratio_target_min * 100.0,
                settings.fdv_ratio_target_max * 100.0,
                settings.min_commits,
                settings.dev_activity_lookback_days,
            ),
            ui::StyleType::Subtle
        )
    );
    println!(
        "{}",
        ui::style_text("✓ Configuration is valid", ui::StyleType::Success)
    );
}
