use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cryptodca::cli::setup::setup;
use cryptodca::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for cryptodca::AppCommand {
    fn from(cmd: Commands) -> cryptodca::AppCommand {
        match cmd {
            Commands::Analyze { amount, output_dir } => cryptodca::AppCommand::Analyze {
                dca_amount: amount,
                output_dir,
            },
            Commands::Validate => cryptodca::AppCommand::Validate,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Analyze projects and recommend DCA purchases
    Analyze {
        /// USD amount to invest, overrides `portfolio.dca_amount`
        #[arg(short, long)]
        amount: Option<f64>,

        /// Directory for the JSON report, overrides `output_dir`
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Check the configuration and list tracked projects
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => cryptodca::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
