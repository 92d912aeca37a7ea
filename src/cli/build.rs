//! Build command implementation

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use super::load_project;
use crate::split::ChunkKind;
use crate::utils::{format_duration, format_size};

/// Split the module graph into chunks
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Module graph JSON, overriding `[graph].path`
    #[arg(short, long)]
    pub graph: Option<PathBuf>,

    /// Print the manifest as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Also write the manifest JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let start = Instant::now();

        let project = load_project(config_path, self.graph.as_deref()).await?;
        let splitter = project.config.splitter()?;
        let entries: Vec<String> = splitter.entries().iter().map(|e| e.name.clone()).collect();

        eprintln!(
            "{} Splitting {} modules for {} page(s)...",
            "→".blue(),
            project.graph.len(),
            entries.len()
        );

        let graph = project.graph;
        let manifest = tokio::task::spawn_blocking(move || splitter.split(&graph))
            .await
            .context("Split task panicked")??;

        let json = manifest.to_json_pretty().context("Failed to serialize manifest")?;
        if let Some(out) = &self.out {
            tokio::fs::write(out, &json)
                .await
                .with_context(|| format!("Failed to write manifest: {}", out.display()))?;
            info!("Wrote manifest to {}", out.display());
        }

        for warning in &manifest.warnings {
            eprintln!("  {} {}", "warning:".yellow().bold(), warning.to_string().yellow());
        }

        if self.json {
            println!("{}", json);
            return Ok(());
        }

        eprintln!(
            "\n{} Produced {} chunk(s) in {}\n",
            "✓".green().bold(),
            manifest.chunks.len(),
            format_duration(start.elapsed())
        );

        for entry in &entries {
            let chunks = manifest.chunks_for_entry(entry);
            let total: u64 = chunks.iter().map(|chunk| chunk.size).sum();
            eprintln!(
                "  {} ({} request(s), {})",
                entry.bold(),
                chunks.len(),
                format_size(total).dimmed()
            );

            for chunk in chunks {
                let label = match chunk.kind {
                    ChunkKind::Entry => "entry",
                    ChunkKind::Page => "page",
                    ChunkKind::Shared => "shared",
                };
                eprintln!(
                    "    {} {} {} {}",
                    "•".dimmed(),
                    chunk.file_name.cyan(),
                    label.dimmed(),
                    format_size(chunk.size).dimmed()
                );
            }
        }

        if !manifest.duplicated.is_empty() {
            eprintln!(
                "\n  {} module(s) duplicated across chunks",
                manifest.duplicated.len().to_string().yellow()
            );
        }

        eprintln!();

        Ok(())
    }
}
