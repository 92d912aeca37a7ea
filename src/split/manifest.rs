//! Chunk manifest handed to the page templating step

use serde::{Deserialize, Serialize};

use super::SplitWarning;

/// Role of an output chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Default chunk of a page
    Entry,
    /// Extracted for a single owning page (e.g. its styles)
    Page,
    /// Shared between pages
    Shared,
}

/// A frozen output chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestChunk {
    /// Position in [`ChunkManifest::chunks`]
    pub id: usize,
    pub name: String,
    pub file_name: String,
    pub kind: ChunkKind,
    /// Cache group that extracted the chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub content_hash: String,
    /// Aggregate member size in bytes
    pub size: u64,
    /// Member module ids, sorted
    pub members: Vec<String>,
    pub required_by: Vec<String>,
    /// Ids of the chunks an entry chunk loads before itself
    pub dependencies: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicationCause {
    /// Shared chunk below `min_size` folded back into its pages
    Undersized,
    /// Inlined to keep a page within its request budget
    RequestBudget,
}

/// A module intentionally emitted in more than one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatedModule {
    pub module: String,
    pub chunks: Vec<usize>,
    pub cause: DuplicationCause,
}

/// Result of a split
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub chunks: Vec<ManifestChunk>,
    #[serde(default)]
    pub duplicated: Vec<DuplicatedModule>,
    #[serde(default)]
    pub warnings: Vec<SplitWarning>,
}

impl ChunkManifest {
    pub fn chunk(&self, id: usize) -> Option<&ManifestChunk> {
        self.chunks.get(id)
    }

    /// The default chunk of `entry`
    pub fn entry_chunk(&self, entry: &str) -> Option<&ManifestChunk> {
        self.chunks
            .iter()
            .find(|chunk| chunk.kind == ChunkKind::Entry && chunk.name == entry)
    }

    /// Chunks a page must load, dependencies first and its own chunk last
    pub fn chunks_for_entry(&self, entry: &str) -> Vec<&ManifestChunk> {
        let Some(entry_chunk) = self.entry_chunk(entry) else {
            return Vec::new();
        };

        let mut chunks: Vec<&ManifestChunk> = entry_chunk
            .dependencies
            .iter()
            .filter_map(|&id| self.chunk(id))
            .collect();
        chunks.push(entry_chunk);
        chunks
    }

    pub fn chunks_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ManifestChunk> + 'a {
        self.chunks.iter().filter(move |chunk| chunk.name == name)
    }

    /// Every chunk containing `module`; more than one only for recorded
    /// duplications
    pub fn chunks_containing(&self, module: &str) -> Vec<&ManifestChunk> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.members.iter().any(|m| m == module))
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
