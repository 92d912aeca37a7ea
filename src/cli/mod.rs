//! Command-line interface for pagesplit
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Split the module graph and print the chunk manifest
//! - `inspect`: Show resolved owners and cache groups per module
//! - `init`: Write a starter configuration

mod build;
mod init;
mod inspect;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, info};

use crate::config::Config;
use crate::graph::ModuleGraph;

pub use build::BuildCommand;
pub use init::InitCommand;
pub use inspect::InspectCommand;

/// pagesplit - page-aware chunk splitting for multi-page builds
#[derive(Parser, Debug)]
#[command(name = "pagesplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to pagesplit.toml config file
    #[arg(short, long, global = true, default_value = crate::config::CONFIG_FILE)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split the module graph into chunks
    Build(BuildCommand),

    /// Show the owner and cache group of each module
    Inspect(InspectCommand),

    /// Initialize a new configuration
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Inspect(cmd) => cmd.execute(&self.config).await,
            Commands::Init(cmd) => cmd.execute().await,
        }
    }
}

/// Print the pagesplit banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "✂".cyan(),
        "pagesplit".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Configuration and module graph of a project
pub(crate) struct Project {
    pub config: Config,
    pub graph: ModuleGraph,
}

/// Load the config file and the module graph it points at.
///
/// `graph_override` replaces the configured graph path.
pub(crate) async fn load_project(config_path: &str, graph_override: Option<&Path>) -> Result<Project> {
    let path = Path::new(config_path);
    let config_file = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    info!("Loading configuration from {}", config_file.display());
    let content = tokio::fs::read_to_string(&config_file)
        .await
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;
    let root = config_file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::from_toml(&content, root)?;

    let graph_path = match graph_override {
        Some(path) => path.to_path_buf(),
        None => config.graph_path(),
    };
    debug!("Reading module graph from {}", graph_path.display());
    let json = tokio::fs::read_to_string(&graph_path)
        .await
        .with_context(|| format!("Failed to read module graph: {}", graph_path.display()))?;
    let graph = ModuleGraph::from_json(&json)
        .with_context(|| format!("Failed to load {}", graph_path.display()))?;

    Ok(Project { config, graph })
}
