//! Initial chunk materialization

use std::collections::HashMap;

use tracing::debug;

use super::cache_group::{CacheGroup, ModuleClass};
use super::chunk::{Chunk, ChunkGraph, ChunkIdx, ChunkOrigin};
use super::{GroupPolicy, SplitContext};
use crate::error::SplitError;
use crate::graph::ModuleIdx;

/// Turns module classifications into a chunk graph.
///
/// Each reachable module is placed exactly once: in its cache group chunk
/// when classified, in its page's chunk when a single page reaches it, or
/// in an implicit shared chunk keyed by the pages reaching it. Chunks of
/// `reuse_existing_chunk` groups are then folded into an extraction loaded
/// by exactly the same pages, when there is one.
pub struct ChunkGraphBuilder<'a> {
    ctx: &'a SplitContext<'a>,
    groups: &'a [CacheGroup],
    defaults: &'a GroupPolicy,
}

impl<'a> ChunkGraphBuilder<'a> {
    pub fn new(ctx: &'a SplitContext<'a>, groups: &'a [CacheGroup], defaults: &'a GroupPolicy) -> Self {
        Self {
            ctx,
            groups,
            defaults,
        }
    }

    pub fn build(&self, classes: &[ModuleClass]) -> Result<ChunkGraph, SplitError> {
        let ctx = self.ctx;
        let mut chunks = ChunkGraph::new(ctx.graph.len());
        for entry in 0..ctx.entries.len() {
            chunks.add_entry_chunk(entry, *self.defaults);
        }

        let mut materialized: HashMap<ChunkOrigin, ChunkIdx> = HashMap::new();

        for &module in &ctx.reachable {
            let references = &ctx.references[module];
            let origin = match &classes[module].selected {
                Some(class) => ChunkOrigin::Group {
                    group: class.group,
                    target: class.target.clone(),
                },
                None if references.len() == 1 => {
                    let target = chunks.entry_chunk(references[0]);
                    self.assign(&mut chunks, module, target)?;
                    continue;
                }
                None => ChunkOrigin::Implicit {
                    entries: references.clone(),
                },
            };

            let target = match materialized.get(&origin) {
                Some(&idx) => idx,
                None => {
                    let idx = chunks.add_chunk(self.materialize(origin.clone()));
                    materialized.insert(origin, idx);
                    idx
                }
            };
            self.assign(&mut chunks, module, target)?;
        }

        chunks.link_required(&ctx.references);
        self.reuse_existing_chunks(&mut chunks);

        debug!(
            "Materialized {} chunks ({} extracted)",
            chunks.chunks().count(),
            materialized.len()
        );

        Ok(chunks)
    }

    /// Hosts are preferred from groups that do not reuse, then by index.
    /// Enforced chunks are never merged, and style-only chunks only merge
    /// with style-only chunks.
    fn reuse_existing_chunks(&self, chunks: &mut ChunkGraph) {
        let graph = self.ctx.graph;
        let extracted: Vec<ChunkIdx> = chunks
            .chunks()
            .filter(|(_, chunk)| !chunk.is_entry() && !chunk.enforce)
            .map(|(idx, _)| idx)
            .collect();

        for &idx in &extracted {
            let chunk = chunks.chunk(idx);
            if chunk.is_empty() || !self.reuses(chunk) {
                continue;
            }

            let host = extracted
                .iter()
                .copied()
                .filter(|&other| other != idx)
                .filter(|&other| {
                    let candidate = chunks.chunk(other);
                    !candidate.is_empty()
                        && candidate.required_by == chunk.required_by
                        && candidate.is_styles_only(graph) == chunk.is_styles_only(graph)
                })
                .min_by_key(|&other| (self.reuses(chunks.chunk(other)), other));

            if let Some(host) = host {
                debug!("Reusing chunk {} for the {} modules of chunk {}", host, chunk.len(), idx);
                chunks.merge_into(idx, host);
            }
        }
    }

    fn reuses(&self, chunk: &Chunk) -> bool {
        chunk
            .group()
            .map_or(false, |group| self.groups[group].reuse_existing_chunk)
    }

    fn materialize(&self, origin: ChunkOrigin) -> Chunk {
        match &origin {
            ChunkOrigin::Group { group, .. } => {
                let group = &self.groups[*group];
                let policy = group.policy(self.defaults);
                Chunk::new(origin, policy, group.enforce)
            }
            _ => Chunk::new(origin, *self.defaults, false),
        }
    }

    fn assign(&self, chunks: &mut ChunkGraph, module: ModuleIdx, chunk: ChunkIdx) -> Result<(), SplitError> {
        chunks.assign(module, chunk).map_err(|existing| SplitError::ExclusivityViolation {
            module: self.ctx.graph.module(module).id.clone(),
            detail: format!("assigned to chunk {} while already in chunk {}", chunk, existing),
        })
    }
}
