use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use cvm_fundos::core::log::init_logging;
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

impl From<Commands> for cvm_fundos::AppCommand {
    fn from(cmd: Commands) -> cvm_fundos::AppCommand {
        match cmd {
            Commands::Load { input, dry_run } => cvm_fundos::AppCommand::Load { input, dry_run },
            Commands::Preview { input, limit, json } => {
                cvm_fundos::AppCommand::Preview { input, limit, json }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Download the fund registry and replace the destination table
    Load {
        /// Read the export from a local file instead of downloading it
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Load into memory only, leaving the database untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the first normalized records without loading them
    Preview {
        /// Read the export from a local file instead of downloading it
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of records to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => cvm_fundos::cli::setup::setup_at_path(path),
            None => cvm_fundos::cli::setup::setup(),
        },
        Some(cmd) => cvm_fundos::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
