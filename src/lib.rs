pub mod cli;
pub mod core;
pub mod providers;

use crate::core::analyzer::StatementFile;
use crate::core::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    /// Upload one statement and show its analysis.
    Analyze {
        file: PathBuf,
        json: bool,
        /// Overrides the configured analyzer endpoint.
        endpoint: Option<String>,
        /// Overrides the configured upload timeout. Zero means no limit.
        timeout_secs: Option<u64>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Analyze {
            file,
            json,
            endpoint,
            timeout_secs,
        } => {
            let endpoint = endpoint.unwrap_or(config.analyzer.url.clone());
            let timeout = match timeout_secs {
                Some(secs) => Some(secs).filter(|s| *s > 0).map(Duration::from_secs),
                None => config.analyzer.timeout(),
            };
            info!(%endpoint, ?timeout, "Using statement analyzer");

            let analyzer = providers::HttpAnalyzer::new(&endpoint)?.with_timeout(timeout);
            let statement = StatementFile::from_path(&file)?;
            cli::analyze::run(&analyzer, &statement, json).await
        }
    }
}
