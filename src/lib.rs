//! pagesplit library
//!
//! Page-aware chunk splitting for multi-page builds: partitions a resolved
//! module graph into per-page, page-style and shared chunks, then names and
//! hashes them for the templating step.

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod split;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use error::SplitError;
pub use graph::{Entry, Module, ModuleGraph};
pub use split::{ChunkManifest, ChunkSplitter, SplitOptions};
