//! Configuration handling for pagesplit
//!
//! Parses and manages pagesplit.toml configuration files.

mod schema;

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::Entry;
use crate::split::{
    CacheGroup, ChunkSplitter, GroupPolicy, ModuleTest, OutputOptions, PageScope, SplitOptions,
};

pub use schema::*;

/// Default config file name
pub const CONFIG_FILE: &str = "pagesplit.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    pub project: ProjectConfig,

    /// Module graph input
    #[serde(default)]
    pub graph: GraphConfig,

    /// Pages in declaration order: entry name to root module ids
    #[serde(default)]
    pub entries: IndexMap<String, EntryConfig>,

    /// Output naming
    #[serde(default)]
    pub output: OutputConfig,

    /// Splitting thresholds and cache groups
    #[serde(default)]
    pub split_chunks: SplitChunksConfig,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Parse configuration text; relative paths resolve against `root`
    pub fn from_toml(content: &str, root: PathBuf) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).with_context(|| format!("Failed to parse {}", CONFIG_FILE))?;
        config.root = root;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            anyhow::bail!("At least one entry must be specified in {}", CONFIG_FILE);
        }

        for (name, entry) in &self.entries {
            if entry.roots().is_empty() {
                anyhow::bail!("Entry '{}' must list at least one root module", name);
            }
        }

        let split = &self.split_chunks;
        if split.max_initial_requests == 0 || split.max_async_requests == 0 {
            anyhow::bail!("max_initial_requests and max_async_requests must be at least 1");
        }

        if !(4..=64).contains(&self.output.hash_length) {
            anyhow::bail!(
                "output.hash_length must be between 4 and 64, got {}",
                self.output.hash_length
            );
        }

        let mut names = HashSet::new();
        for group in &split.cache_groups {
            if !names.insert(group.name.as_str()) {
                anyhow::bail!("Cache group '{}' is declared more than once", group.name);
            }

            if matches!(group.max_initial_requests, Some(0)) || matches!(group.max_async_requests, Some(0)) {
                anyhow::bail!("Cache group '{}' request budgets must be at least 1", group.name);
            }

            if let Some(page) = group.page.as_deref() {
                if page != "*" && !self.entries.contains_key(page) {
                    anyhow::bail!(
                        "Cache group '{}' is scoped to unknown entry '{}'",
                        group.name,
                        page
                    );
                }
            }
        }

        Ok(())
    }

    /// Get the absolute module graph path
    pub fn graph_path(&self) -> PathBuf {
        self.root.join(&self.graph.path)
    }

    /// Entries in the order they are declared
    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .map(|(name, entry)| Entry::new(name.clone(), entry.roots().iter().cloned()).with_loading(entry.loading()))
            .collect()
    }

    /// Compile thresholds, naming and cache groups into engine options
    pub fn split_options(&self) -> Result<SplitOptions> {
        let split = &self.split_chunks;

        let cache_groups = if split.cache_groups.is_empty() {
            vec![CacheGroup::default_vendors(), CacheGroup::default_shared()]
        } else {
            split
                .cache_groups
                .iter()
                .map(compile_cache_group)
                .collect::<Result<Vec<_>>>()?
        };

        Ok(SplitOptions {
            defaults: GroupPolicy {
                min_size: split.min_size,
                min_chunks: split.min_chunks,
                max_initial_requests: split.max_initial_requests,
                max_async_requests: split.max_async_requests,
            },
            cache_groups,
            max_duplicate_size: split.max_duplicate_size,
            output: OutputOptions {
                filename: self.output.filename.clone(),
                hash_length: self.output.hash_length,
                naming: self.output.naming,
                automatic_name_delimiter: self.output.automatic_name_delimiter.clone(),
            },
        })
    }

    /// Build the splitting engine for this project
    pub fn splitter(&self) -> Result<ChunkSplitter> {
        let splitter = ChunkSplitter::new(self.entries(), self.split_options()?)
            .context("Invalid split configuration")?;
        Ok(splitter)
    }
}

fn compile_cache_group(config: &CacheGroupConfig) -> Result<CacheGroup> {
    let id_pattern = config
        .test
        .as_deref()
        .map(Regex::new)
        .transpose()
        .with_context(|| format!("Invalid test pattern in cache group '{}'", config.name))?;

    let test = ModuleTest {
        kind: config.kind,
        id_pattern,
        min_module_size: config.min_module_size,
    };

    let scope = match config.page.as_deref() {
        None => PageScope::Shared,
        Some("*") => PageScope::EachOwner,
        Some(entry) => PageScope::Entry(entry.to_string()),
    };

    Ok(CacheGroup {
        priority: config.priority,
        enforce: config.enforce,
        min_size: config.min_size,
        min_chunks: config.min_chunks,
        max_initial_requests: config.max_initial_requests,
        max_async_requests: config.max_async_requests,
        chunk_name: config.chunk_name.clone(),
        scope,
        reuse_existing_chunk: config.reuse_existing_chunk,
        ..CacheGroup::new(config.name.clone(), test)
    })
}
