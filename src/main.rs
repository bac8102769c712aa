use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use finanalyze::core::log::init_logging;
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

impl From<Commands> for finanalyze::AppCommand {
    fn from(cmd: Commands) -> finanalyze::AppCommand {
        match cmd {
            Commands::Analyze {
                file,
                json,
                endpoint,
                timeout,
            } => finanalyze::AppCommand::Analyze {
                file,
                json,
                endpoint,
                timeout_secs: timeout,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Upload a bank statement (PDF, XLS, XLSX or CSV) and show its analysis
    Analyze {
        /// Statement file to upload
        file: PathBuf,

        /// Print the dashboard as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Analyzer endpoint, overrides the configured URL
        #[arg(short, long, env = "FINANALYZE_ENDPOINT")]
        endpoint: Option<String>,

        /// Upload timeout in seconds, 0 disables it
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => finanalyze::cli::setup::setup(),
        Some(cmd) => finanalyze::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
