//! Chunk arena for code splitting
//!
//! Chunks and modules reference each other only by index. Every module's
//! placements are tracked next to the chunks, so exclusivity can be checked
//! without trusting the stages that moved modules around.

use std::collections::{BTreeSet, HashSet};

use super::cache_group::{GroupIdx, Target};
use super::{EntryIdx, GroupPolicy, SplitContext};
use crate::error::SplitError;
use crate::graph::{ModuleGraph, ModuleIdx, ModuleKind};

/// Index of a chunk in a [`ChunkGraph`]
pub type ChunkIdx = usize;

/// Why a chunk exists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChunkOrigin {
    /// Default chunk of a page
    Entry(EntryIdx),
    /// Extracted by a cache group
    Group { group: GroupIdx, target: Target },
    /// Shared by several pages without any group claiming it
    Implicit { entries: Vec<EntryIdx> },
}

/// A group of modules emitted together
#[derive(Debug, Clone)]
pub struct Chunk {
    pub origin: ChunkOrigin,

    /// Thresholds the chunk must satisfy
    pub policy: GroupPolicy,

    /// Exempt from size and request thresholds
    pub enforce: bool,

    pub modules: BTreeSet<ModuleIdx>,

    /// Entries that load this chunk
    pub required_by: BTreeSet<EntryIdx>,

    /// Chunks this one needs loaded alongside it
    pub dependencies: BTreeSet<ChunkIdx>,
}

impl Chunk {
    pub fn new(origin: ChunkOrigin, policy: GroupPolicy, enforce: bool) -> Self {
        Self {
            origin,
            policy,
            enforce,
            modules: BTreeSet::new(),
            required_by: BTreeSet::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.origin, ChunkOrigin::Entry(_))
    }

    pub fn group(&self) -> Option<GroupIdx> {
        match self.origin {
            ChunkOrigin::Group { group, .. } => Some(group),
            _ => None,
        }
    }

    /// Aggregate size of all members
    pub fn size(&self, graph: &ModuleGraph) -> u64 {
        self.modules.iter().map(|&m| graph.size_of(m)).sum()
    }

    /// Check if chunk is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of modules in chunk
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Non-empty and made only of style modules
    pub fn is_styles_only(&self, graph: &ModuleGraph) -> bool {
        !self.is_empty()
            && self
                .modules
                .iter()
                .all(|&m| graph.kind_of(m) == ModuleKind::Style)
    }
}

/// Why a module was placed in more than one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicationReason {
    /// The shared chunk was below its minimum size and got dissolved
    Undersized { chunk: ChunkIdx },
    /// The entry was over its request budget and inlined the chunk
    BudgetInlined { entry: EntryIdx, chunk: ChunkIdx },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplication {
    pub module: ModuleIdx,
    pub reason: DuplicationReason,
}

/// Arena of chunks plus the module placement table
#[derive(Debug, Default)]
pub struct ChunkGraph {
    chunks: Vec<Chunk>,

    /// Default chunk of each entry, indexed by `EntryIdx`
    entry_chunks: Vec<ChunkIdx>,

    /// Chunks holding each module, indexed by `ModuleIdx`
    placements: Vec<BTreeSet<ChunkIdx>>,

    /// Ledger of intentional duplications
    duplications: Vec<Duplication>,
}

impl ChunkGraph {
    pub fn new(module_count: usize) -> Self {
        Self {
            placements: vec![BTreeSet::new(); module_count],
            ..Self::default()
        }
    }

    /// Add the default chunk for the next entry; entries must be added in order
    pub fn add_entry_chunk(&mut self, entry: EntryIdx, policy: GroupPolicy) -> ChunkIdx {
        debug_assert_eq!(entry, self.entry_chunks.len());
        let idx = self.add_chunk(Chunk::new(ChunkOrigin::Entry(entry), policy, false));
        self.entry_chunks.push(idx);
        idx
    }

    pub fn add_chunk(&mut self, chunk: Chunk) -> ChunkIdx {
        self.chunks.push(chunk);
        self.chunks.len() - 1
    }

    pub fn chunk(&self, idx: ChunkIdx) -> &Chunk {
        &self.chunks[idx]
    }

    pub fn chunks(&self) -> impl Iterator<Item = (ChunkIdx, &Chunk)> {
        self.chunks.iter().enumerate()
    }

    pub fn entry_chunk(&self, entry: EntryIdx) -> ChunkIdx {
        self.entry_chunks[entry]
    }

    pub fn placements(&self, module: ModuleIdx) -> &BTreeSet<ChunkIdx> {
        &self.placements[module]
    }

    pub fn duplications(&self) -> &[Duplication] {
        &self.duplications
    }

    /// Chunks an entry loads: its own plus every dependency
    pub fn requests(&self, entry: EntryIdx) -> usize {
        1 + self.chunks[self.entry_chunks[entry]].dependencies.len()
    }

    /// First placement of a module. On conflict nothing changes and the
    /// chunk already holding the module is returned.
    pub fn assign(&mut self, module: ModuleIdx, chunk: ChunkIdx) -> Result<(), ChunkIdx> {
        if let Some(&existing) = self.placements[module].iter().next() {
            return Err(existing);
        }
        self.place(module, chunk);
        Ok(())
    }

    fn place(&mut self, module: ModuleIdx, chunk: ChunkIdx) {
        self.chunks[chunk].modules.insert(module);
        self.placements[module].insert(chunk);
    }

    fn unplace(&mut self, module: ModuleIdx, chunk: ChunkIdx) {
        self.chunks[chunk].modules.remove(&module);
        self.placements[module].remove(&chunk);
    }

    /// Compute `required_by` of every extracted chunk and link it from the
    /// entry chunks that reach any of its members
    pub fn link_required(&mut self, references: &[Vec<EntryIdx>]) {
        for idx in 0..self.chunks.len() {
            if self.chunks[idx].is_entry() {
                continue;
            }
            let required_by: BTreeSet<EntryIdx> = self.chunks[idx]
                .modules
                .iter()
                .flat_map(|&m| references[m].iter().copied())
                .collect();
            for &entry in &required_by {
                let entry_chunk = self.entry_chunks[entry];
                self.chunks[entry_chunk].dependencies.insert(idx);
            }
            self.chunks[idx].required_by = required_by;
        }
    }

    /// Put every member of `chunk` back into the entry chunk of each page
    /// reaching it, leaving `chunk` empty and unlinked
    pub fn dissolve(&mut self, chunk: ChunkIdx, references: &[Vec<EntryIdx>]) {
        let members: Vec<ModuleIdx> = self.chunks[chunk].modules.iter().copied().collect();
        for module in members {
            self.unplace(module, chunk);
            for &entry in &references[module] {
                let target = self.entry_chunks[entry];
                self.place(module, target);
            }
            if references[module].len() > 1 {
                self.duplications.push(Duplication {
                    module,
                    reason: DuplicationReason::Undersized { chunk },
                });
            }
        }

        let required_by = std::mem::take(&mut self.chunks[chunk].required_by);
        for entry in required_by {
            let entry_chunk = self.entry_chunks[entry];
            self.chunks[entry_chunk].dependencies.remove(&chunk);
        }
    }

    /// Move every member of `from` into `to`, which must be loaded by the
    /// same entries, leaving `from` empty and unlinked
    pub fn merge_into(&mut self, from: ChunkIdx, to: ChunkIdx) {
        debug_assert_eq!(self.chunks[from].required_by, self.chunks[to].required_by);
        let members: Vec<ModuleIdx> = self.chunks[from].modules.iter().copied().collect();
        for module in members {
            self.unplace(module, from);
            self.place(module, to);
        }

        let required_by = std::mem::take(&mut self.chunks[from].required_by);
        for entry in required_by {
            let entry_chunk = self.entry_chunks[entry];
            self.chunks[entry_chunk].dependencies.remove(&from);
        }
    }

    /// Members of `chunk` that `entry` needs, each paired with whether it
    /// must stay in `chunk` for the other entries (and so be copied)
    pub fn inline_plan(
        &self,
        entry: EntryIdx,
        chunk: ChunkIdx,
        references: &[Vec<EntryIdx>],
    ) -> Vec<(ModuleIdx, bool)> {
        let others: Vec<EntryIdx> = self.chunks[chunk]
            .required_by
            .iter()
            .copied()
            .filter(|&e| e != entry)
            .collect();

        self.chunks[chunk]
            .modules
            .iter()
            .copied()
            .filter(|&m| references[m].contains(&entry))
            .map(|m| (m, references[m].iter().any(|e| others.contains(e))))
            .collect()
    }

    /// Bytes inlining `chunk` into `entry` would duplicate
    pub fn inline_cost(
        &self,
        entry: EntryIdx,
        chunk: ChunkIdx,
        references: &[Vec<EntryIdx>],
        graph: &ModuleGraph,
    ) -> u64 {
        self.inline_plan(entry, chunk, references)
            .into_iter()
            .filter(|&(_, copied)| copied)
            .map(|(m, _)| graph.size_of(m))
            .sum()
    }

    /// Stop loading `chunk` from `entry`, moving or copying the members the
    /// entry needs into its own chunk
    pub fn inline(&mut self, entry: EntryIdx, chunk: ChunkIdx, references: &[Vec<EntryIdx>]) {
        let plan = self.inline_plan(entry, chunk, references);
        let entry_chunk = self.entry_chunks[entry];

        for (module, copied) in plan {
            if copied {
                self.duplications.push(Duplication {
                    module,
                    reason: DuplicationReason::BudgetInlined { entry, chunk },
                });
            } else {
                self.unplace(module, chunk);
            }
            self.place(module, entry_chunk);
        }

        self.chunks[chunk].required_by.remove(&entry);
        self.chunks[entry_chunk].dependencies.remove(&chunk);
    }

    /// Check that every reachable module is placed, that multiple placements
    /// are all recorded duplications, and that every entry can load all of
    /// its modules
    pub fn verify(&self, ctx: &SplitContext<'_>) -> Result<(), SplitError> {
        let justified: HashSet<ModuleIdx> = self.duplications.iter().map(|d| d.module).collect();
        let id = |m: ModuleIdx| ctx.graph.module(m).id.clone();

        for (module, placements) in self.placements.iter().enumerate() {
            let reachable = !ctx.references[module].is_empty();
            match (reachable, placements.len()) {
                (false, 0) | (true, 1) => {}
                (false, _) => {
                    return Err(SplitError::ExclusivityViolation {
                        module: id(module),
                        detail: "is placed although no entry reaches it".to_string(),
                    });
                }
                (true, 0) => {
                    return Err(SplitError::ExclusivityViolation {
                        module: id(module),
                        detail: "is not assigned to any chunk".to_string(),
                    });
                }
                (true, n) if !justified.contains(&module) => {
                    return Err(SplitError::ExclusivityViolation {
                        module: id(module),
                        detail: format!("is in {} chunks without a recorded duplication", n),
                    });
                }
                (true, _) => {}
            }
        }

        for (e, entry) in ctx.entries.iter().enumerate() {
            let entry_chunk = self.entry_chunks[e];
            let mut loaded: HashSet<ChunkIdx> =
                self.chunks[entry_chunk].dependencies.iter().copied().collect();
            loaded.insert(entry_chunk);

            for &module in &entry.reach {
                if !self.placements[module].iter().any(|c| loaded.contains(c)) {
                    return Err(SplitError::MissingRequiredModule {
                        entry: entry.name.clone(),
                        module: id(module),
                    });
                }
            }
        }

        Ok(())
    }
}
