//! Inspect command: per-module ownership and group selection

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::load_project;
use crate::utils::format_size;

/// Show the owner and cache group of each module
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Only show this module id
    #[arg(short, long)]
    pub module: Option<String>,

    /// Module graph JSON, overriding `[graph].path`
    #[arg(short, long)]
    pub graph: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let project = load_project(config_path, self.graph.as_deref()).await?;
        let splitter = project.config.splitter()?;

        let graph = project.graph;
        let mut reports = tokio::task::spawn_blocking(move || splitter.explain(&graph))
            .await
            .context("Inspect task panicked")??;

        if let Some(module) = &self.module {
            reports.retain(|report| report.module == *module);
            if reports.is_empty() {
                anyhow::bail!("Module '{}' is not reachable from any entry", module);
            }
        }

        if self.json {
            let json = serde_json::to_string_pretty(&reports).context("Failed to serialize reports")?;
            println!("{}", json);
            return Ok(());
        }

        for report in &reports {
            let owner = report.owner.as_deref().unwrap_or("unowned");
            let group = report.group.as_deref().unwrap_or("-");
            println!(
                "{} {} {}",
                report.module.cyan(),
                report.kind.as_str().dimmed(),
                format_size(report.size).dimmed()
            );
            println!("    owner:  {}", owner);
            println!("    group:  {}", group);
            println!("    pages:  {}", report.referenced_by.join(", "));
        }

        Ok(())
    }
}
