pub mod cli;
pub mod core;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Load {
        input: Option<PathBuf>,
        dry_run: bool,
    },
    Preview {
        input: Option<PathBuf>,
        limit: usize,
        json: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("CVM fund registry loader starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    config.validate()?;
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Load { input, dry_run } => {
            cli::load::run(&config, input.as_deref(), dry_run).await
        }
        AppCommand::Preview { input, limit, json } => {
            cli::preview::run(&config, input.as_deref(), limit, json).await
        }
    }
}
