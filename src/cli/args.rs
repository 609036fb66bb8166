//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strata - Layered container build orchestrator
///
/// Resolves a six-stage build pipeline (base image, system packages,
/// workspace, dependencies, source, launch command) into content-addressed
/// layers and drives docker or podman to build it.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Pipeline file (defaults to strata.toml in the build context)
    #[arg(short = 'f', long, global = true, env = "STRATA_PIPELINE")]
    pub file: Option<PathBuf>,

    /// Build context directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub context: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, global = true, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a starter strata.toml pipeline
    Init(InitArgs),

    /// Resolve the pipeline and show stage cache keys
    Plan(PlanArgs),

    /// Print the generated Containerfile
    Render(RenderArgs),

    /// Build the image through the configured container tool
    Build(BuildArgs),

    /// Inspect or prune the stage-key ledger
    Cache(CacheArgs),

    /// Check pipeline, build tool, and state health
    Status,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite an existing strata.toml
    #[arg(long)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the render command
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Write the Containerfile to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Ignore the ledger and the tool's layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Override the content-addressed image tag
    #[arg(short, long)]
    pub tag: Option<String>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List committed stage keys
    List {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove ledger entries older than N days
    Gc {
        /// Age cutoff in days (default: from config)
        #[arg(long)]
        days: Option<u32>,

        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear the whole ledger
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format for plan and cache listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
