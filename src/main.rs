//! Strata - Layered container build orchestrator
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use strata::cli::{Cli, Commands};
use strata::config::schema::GeneralConfig;
use strata::config::ConfigManager;
use strata::error::{StrataError, StrataResult};
use strata::pipeline::PIPELINE_FILE;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StrataResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // -v/-vv take precedence; general.verbose raises the default level.
    // Logs go to stderr; stdout is reserved for command output.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_directive(cli.verbose, &config.general)))
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }

    // Init doesn't need an existing pipeline
    let command = match cli.command {
        Commands::Init(args) => return strata::cli::commands::init(args).await,
        other => other,
    };

    let context_dir = match cli.context {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| StrataError::io("getting current directory", e))?,
    };
    let pipeline_path: PathBuf = match cli.file {
        Some(file) => file,
        None => context_dir.join(PIPELINE_FILE),
    };

    match command {
        Commands::Init(_) => unreachable!("handled above"),
        Commands::Plan(args) => {
            strata::cli::commands::plan(args, &pipeline_path, &context_dir).await
        }
        Commands::Render(args) => strata::cli::commands::render(args, &pipeline_path).await,
        Commands::Build(args) => {
            strata::cli::commands::build(args, &pipeline_path, &context_dir, &config).await
        }
        Commands::Cache(args) => strata::cli::commands::cache(args, &config).await,
        Commands::Status => strata::cli::commands::status(&pipeline_path, &config).await,
    }
}

/// Log filter directive: 0 = warn, 1 = info, 2+ = debug
fn log_directive(verbosity: u8, general: &GeneralConfig) -> &'static str {
    match verbosity {
        0 if general.verbose => "strata=info",
        0 => "strata=warn",
        1 => "strata=info",
        _ => "strata=debug",
    }
}
