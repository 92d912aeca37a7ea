//! Final chunk names, content hashes and file names

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::cache_group::{CacheGroup, Target};
use super::chunk::{Chunk, ChunkGraph, ChunkIdx, ChunkOrigin, DuplicationReason};
use super::manifest::{ChunkKind, ChunkManifest, DuplicatedModule, DuplicationCause, ManifestChunk};
use super::{OutputOptions, SplitContext, SplitWarning};
use crate::graph::{ModuleGraph, ModuleIdx};
use crate::utils::render_filename;

/// How chunks without a group or entry name are named
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkNaming {
    /// `common-0`, `common-1`, ...
    #[default]
    Sequential,
    /// Group name and the pages sharing the chunk, e.g. `default~home~map`
    Automatic,
}

/// Deterministic fingerprint of a set of modules.
///
/// Members are sorted by id and both id and fingerprint are
/// length-prefixed, so the result only depends on membership and content.
pub fn content_hash(graph: &ModuleGraph, modules: impl IntoIterator<Item = ModuleIdx>, length: usize) -> String {
    let mut members: Vec<_> = modules.into_iter().map(|m| graph.module(m)).collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for module in members {
        hasher.update((module.id.len() as u64).to_le_bytes());
        hasher.update(module.id.as_bytes());
        hasher.update((module.fingerprint.len() as u64).to_le_bytes());
        hasher.update(module.fingerprint.as_bytes());
    }

    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(length);
    digest
}

/// Freezes a chunk graph into the manifest
pub struct OutputNamer<'a> {
    ctx: &'a SplitContext<'a>,
    groups: &'a [CacheGroup],
    output: &'a OutputOptions,
}

impl<'a> OutputNamer<'a> {
    pub fn new(ctx: &'a SplitContext<'a>, groups: &'a [CacheGroup], output: &'a OutputOptions) -> Self {
        Self { ctx, groups, output }
    }

    pub fn finalize(&self, chunks: &ChunkGraph, warnings: Vec<SplitWarning>) -> ChunkManifest {
        let graph = self.ctx.graph;

        // entry chunks are kept even when empty; dissolved extractions are not
        let live: Vec<ChunkIdx> = chunks
            .chunks()
            .filter(|(_, chunk)| chunk.is_entry() || !chunk.is_empty())
            .map(|(idx, _)| idx)
            .collect();
        let manifest_id: HashMap<ChunkIdx, usize> =
            live.iter().enumerate().map(|(id, &idx)| (idx, id)).collect();

        let mut synthetic = self.reserved_names();
        let names: Vec<String> = live
            .iter()
            .map(|&idx| self.name_for(chunks.chunk(idx), &mut synthetic))
            .collect();

        let hashes: Vec<String> = live
            .par_iter()
            .map(|&idx| {
                let chunk = chunks.chunk(idx);
                content_hash(graph, chunk.modules.iter().copied(), self.output.hash_length)
            })
            .collect();

        let manifest_chunks = live
            .iter()
            .zip(names)
            .zip(hashes)
            .enumerate()
            .map(|(id, ((&idx, name), content_hash))| {
                let chunk = chunks.chunk(idx);
                let ext = extension(graph, chunk);
                let mut members: Vec<String> =
                    chunk.modules.iter().map(|&m| graph.module(m).id.clone()).collect();
                members.sort();

                ManifestChunk {
                    id,
                    file_name: render_filename(&self.output.filename, &name, &content_hash, ext),
                    name,
                    kind: self.kind_of(chunk),
                    group: chunk.group().map(|g| self.groups[g].name.clone()),
                    content_hash,
                    size: chunk.size(graph),
                    members,
                    required_by: self.required_by(chunks, idx),
                    dependencies: chunk
                        .dependencies
                        .iter()
                        .filter_map(|dep| manifest_id.get(dep).copied())
                        .collect(),
                }
            })
            .collect();

        ChunkManifest {
            chunks: manifest_chunks,
            duplicated: self.duplicated(chunks, &manifest_id),
            warnings,
        }
    }

    /// Entry names and fixed group names, which synthetic names must avoid
    fn reserved_names(&self) -> SyntheticNames {
        let taken = self
            .ctx
            .entries
            .iter()
            .map(|entry| entry.name.clone())
            .chain(self.groups.iter().filter_map(|group| group.chunk_name.clone()))
            .collect();
        SyntheticNames { taken, next: 0 }
    }

    /// Group override, then owner or entry name, then a synthetic name
    fn name_for(&self, chunk: &Chunk, synthetic: &mut SyntheticNames) -> String {
        match &chunk.origin {
            ChunkOrigin::Entry(e) => self.ctx.entry_name(*e).to_string(),
            ChunkOrigin::Group { group, target } => {
                let group = &self.groups[*group];
                if let Some(name) = &group.chunk_name {
                    return name.clone();
                }
                match target {
                    Target::Owner(e) => self.ctx.entry_name(*e).to_string(),
                    _ => self.synthetic_name(Some(&group.name), chunk, synthetic),
                }
            }
            ChunkOrigin::Implicit { .. } => self.synthetic_name(None, chunk, synthetic),
        }
    }

    fn synthetic_name(&self, group: Option<&str>, chunk: &Chunk, synthetic: &mut SyntheticNames) -> String {
        let name = match self.output.naming {
            ChunkNaming::Sequential => loop {
                let name = format!("common-{}", synthetic.next);
                synthetic.next += 1;
                if !synthetic.taken.contains(&name) {
                    break name;
                }
            },
            ChunkNaming::Automatic => {
                let mut parts = vec![group.unwrap_or("shared")];
                parts.extend(chunk.required_by.iter().map(|&e| self.ctx.entry_name(e)));
                let base = parts.join(&self.output.automatic_name_delimiter);
                let mut name = base.clone();
                let mut suffix = 1;
                while synthetic.taken.contains(&name) {
                    name = format!("{}{}{}", base, self.output.automatic_name_delimiter, suffix);
                    suffix += 1;
                }
                name
            }
        };
        synthetic.taken.insert(name.clone());
        name
    }

    fn kind_of(&self, chunk: &Chunk) -> ChunkKind {
        match &chunk.origin {
            ChunkOrigin::Entry(_) => ChunkKind::Entry,
            ChunkOrigin::Group {
                target: Target::Owner(_),
                ..
            } => ChunkKind::Page,
            _ => ChunkKind::Shared,
        }
    }

    fn required_by(&self, chunks: &ChunkGraph, idx: ChunkIdx) -> Vec<String> {
        let chunk = chunks.chunk(idx);
        match chunk.origin {
            ChunkOrigin::Entry(e) => vec![self.ctx.entry_name(e).to_string()],
            _ => chunk
                .required_by
                .iter()
                .map(|&e| self.ctx.entry_name(e).to_string())
                .collect(),
        }
    }

    /// One ledger record per duplicated module, sorted by module id
    fn duplicated(&self, chunks: &ChunkGraph, manifest_id: &HashMap<ChunkIdx, usize>) -> Vec<DuplicatedModule> {
        let mut first_reason: HashMap<ModuleIdx, DuplicationReason> = HashMap::new();
        for duplication in chunks.duplications() {
            first_reason.entry(duplication.module).or_insert(duplication.reason);
        }

        let mut records: Vec<DuplicatedModule> = first_reason
            .into_iter()
            .filter(|(module, _)| chunks.placements(*module).len() > 1)
            .map(|(module, reason)| DuplicatedModule {
                module: self.ctx.graph.module(module).id.clone(),
                chunks: chunks
                    .placements(module)
                    .iter()
                    .filter_map(|c| manifest_id.get(c).copied())
                    .collect(),
                cause: match reason {
                    DuplicationReason::Undersized { .. } => DuplicationCause::Undersized,
                    DuplicationReason::BudgetInlined { .. } => DuplicationCause::RequestBudget,
                },
            })
            .collect();
        records.sort_by(|a, b| a.module.cmp(&b.module));
        records
    }
}

/// Names already handed out or reserved
struct SyntheticNames {
    taken: HashSet<String>,
    next: usize,
}

/// `css` for chunks made only of style modules, `js` otherwise
fn extension(graph: &ModuleGraph, chunk: &Chunk) -> &'static str {
    if chunk.is_styles_only(graph) {
        "css"
    } else {
        "js"
    }
}
