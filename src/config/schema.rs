//! Configuration schema definitions

use serde::{Deserialize, Serialize};

use crate::graph::{Loading, ModuleKind};
use crate::split::ChunkNaming;

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,
}

/// Where the resolved module graph comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// JSON module graph dump, relative to the config file
    #[serde(default = "default_graph_path")]
    pub path: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: default_graph_path(),
        }
    }
}

fn default_graph_path() -> String {
    "module-graph.json".to_string()
}

/// An entry: either a bare list of roots or a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryConfig {
    Roots(Vec<String>),
    Detailed {
        roots: Vec<String>,
        #[serde(default)]
        loading: Loading,
    },
}

impl EntryConfig {
    pub fn roots(&self) -> &[String] {
        match self {
            EntryConfig::Roots(roots) => roots,
            EntryConfig::Detailed { roots, .. } => roots,
        }
    }

    pub fn loading(&self) -> Loading {
        match self {
            EntryConfig::Roots(_) => Loading::Initial,
            EntryConfig::Detailed { loading, .. } => *loading,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name template (`[name]`, `[contenthash]`, `[ext]`)
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Hex digits of the content hash kept in file names
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,

    /// Naming of chunks without a group or entry name
    #[serde(default)]
    pub naming: ChunkNaming,

    /// Separator for automatic chunk names
    #[serde(default = "default_delimiter")]
    pub automatic_name_delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            hash_length: default_hash_length(),
            naming: ChunkNaming::default(),
            automatic_name_delimiter: default_delimiter(),
        }
    }
}

fn default_filename() -> String {
    "[name]/[contenthash].[ext]".to_string()
}

fn default_hash_length() -> usize {
    8
}

fn default_delimiter() -> String {
    "~".to_string()
}

/// Top-level splitting thresholds and cache groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitChunksConfig {
    #[serde(default = "default_min_size")]
    pub min_size: u64,

    #[serde(default = "default_min_chunks")]
    pub min_chunks: usize,

    #[serde(default = "default_max_requests")]
    pub max_async_requests: usize,

    #[serde(default = "default_max_requests")]
    pub max_initial_requests: usize,

    /// Bytes request budgets may duplicate across pages
    #[serde(default)]
    pub max_duplicate_size: Option<u64>,

    /// Ordered cache groups; empty means the built-in defaults
    #[serde(default)]
    pub cache_groups: Vec<CacheGroupConfig>,
}

impl Default for SplitChunksConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            min_chunks: default_min_chunks(),
            max_async_requests: default_max_requests(),
            max_initial_requests: default_max_requests(),
            max_duplicate_size: None,
            cache_groups: Vec::new(),
        }
    }
}

fn default_min_size() -> u64 {
    20_000
}

fn default_min_chunks() -> usize {
    1
}

fn default_max_requests() -> usize {
    30
}

/// A cache group; unset thresholds inherit from `[split_chunks]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheGroupConfig {
    pub name: String,

    /// Output chunk name override
    #[serde(default)]
    pub chunk_name: Option<String>,

    /// Only modules of this kind
    #[serde(default)]
    pub kind: Option<ModuleKind>,

    /// Regex the module id must match
    #[serde(default)]
    pub test: Option<String>,

    /// Only modules at least this large
    #[serde(default)]
    pub min_module_size: Option<u64>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub enforce: bool,

    #[serde(default)]
    pub min_size: Option<u64>,

    #[serde(default)]
    pub min_chunks: Option<usize>,

    #[serde(default)]
    pub max_initial_requests: Option<usize>,

    #[serde(default)]
    pub max_async_requests: Option<usize>,

    /// Page scope: an entry name, or `*` for one chunk per owning page
    #[serde(default)]
    pub page: Option<String>,

    /// Fold into an existing chunk loaded by the same pages
    #[serde(default)]
    pub reuse_existing_chunk: bool,
}
