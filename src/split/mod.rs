//! Chunk splitting engine
//!
//! Partitions a module graph spanning several pages into chunks:
//!
//! 1. per-entry reachability (parallel, then a barrier for reference counts)
//! 2. owner resolution along issuer chains ([`IssuerTracker`])
//! 3. cache group classification ([`CacheGroupMatcher`])
//! 4. chunk materialization ([`ChunkGraphBuilder`])
//! 5. size and request budget enforcement ([`SizeThresholdSplitter`])
//! 6. naming and content hashing ([`OutputNamer`])

mod builder;
mod cache_group;
mod chunk;
mod issuer;
mod manifest;
mod namer;
mod threshold;

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SplitError;
use crate::graph::{Entry, Loading, ModuleGraph, ModuleIdx, ModuleKind};

pub use builder::ChunkGraphBuilder;
pub use cache_group::{
    CacheGroup, CacheGroupMatcher, Candidate, Classification, GroupIdx, ModuleClass,
    ModulePredicate, ModuleTest, PageScope, PredicateError, PredicateFailure, Target,
    NODE_MODULES,
};
pub use chunk::{Chunk, ChunkGraph, ChunkIdx, ChunkOrigin, Duplication, DuplicationReason};
pub use issuer::{IssuerTracker, Owner};
pub use manifest::{ChunkKind, ChunkManifest, DuplicatedModule, DuplicationCause, ManifestChunk};
pub use namer::{content_hash, ChunkNaming, OutputNamer};
pub use threshold::SizeThresholdSplitter;

/// Index of an entry in declaration order
pub type EntryIdx = usize;

/// Size and request thresholds of a cache group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPolicy {
    /// Smallest aggregate chunk size worth a separate request
    pub min_size: u64,
    /// Fewest pages that must share a module before it is extracted
    pub min_chunks: usize,
    pub max_initial_requests: usize,
    pub max_async_requests: usize,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            min_size: 20_000,
            min_chunks: 1,
            max_initial_requests: 30,
            max_async_requests: 30,
        }
    }
}

impl GroupPolicy {
    pub fn max_requests(&self, loading: Loading) -> usize {
        match loading {
            Loading::Initial => self.max_initial_requests,
            Loading::Async => self.max_async_requests,
        }
    }
}

/// Output naming options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// File name template with `[name]`, `[contenthash]` and `[ext]`
    pub filename: String,
    pub hash_length: usize,
    pub naming: ChunkNaming,
    pub automatic_name_delimiter: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            filename: "[name]/[contenthash].[ext]".to_string(),
            hash_length: 8,
            naming: ChunkNaming::Sequential,
            automatic_name_delimiter: "~".to_string(),
        }
    }
}

/// Everything the engine needs besides the graph and the entries
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Thresholds inherited by groups that leave them unset
    pub defaults: GroupPolicy,
    /// Cache groups in declaration order
    pub cache_groups: Vec<CacheGroup>,
    /// Total bytes request budgets may duplicate; `None` is unlimited
    pub max_duplicate_size: Option<u64>,
    pub output: OutputOptions,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            defaults: GroupPolicy::default(),
            cache_groups: vec![CacheGroup::default_vendors(), CacheGroup::default_shared()],
            max_duplicate_size: None,
            output: OutputOptions::default(),
        }
    }
}

/// Why a request budget could not be met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetCause {
    /// Enforced chunks alone exceed the budget
    Enforced,
    /// Inlining would duplicate more than `max_duplicate_size`
    DuplicationLimit,
}

/// Non-fatal problems found during a split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SplitWarning {
    #[serde(rename_all = "camelCase")]
    BudgetExceeded {
        entry: String,
        requests: usize,
        budget: usize,
        cause: BudgetCause,
    },
    #[serde(rename_all = "camelCase")]
    PredicateFailed {
        group: String,
        module: String,
        message: String,
    },
}

impl fmt::Display for SplitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitWarning::BudgetExceeded {
                entry,
                requests,
                budget,
                cause,
            } => {
                let why = match cause {
                    BudgetCause::Enforced => "enforced chunks",
                    BudgetCause::DuplicationLimit => "duplication limit reached",
                };
                write!(
                    f,
                    "entry '{}' needs {} requests, budget is {} ({})",
                    entry, requests, budget, why
                )
            }
            SplitWarning::PredicateFailed {
                group,
                module,
                message,
            } => write!(f, "cache group '{}' skipped {}: {}", group, module, message),
        }
    }
}

/// An entry with its roots resolved and its reachable modules computed
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    pub name: String,
    pub roots: Vec<ModuleIdx>,
    pub loading: Loading,
    /// Modules reachable from the roots, BFS order
    pub reach: Vec<ModuleIdx>,
}

/// Immutable per-build state shared by all stages
#[derive(Debug)]
pub struct SplitContext<'a> {
    pub graph: &'a ModuleGraph,
    pub entries: Vec<ResolvedEntry>,
    /// Entries reaching each module (sorted), indexed by `ModuleIdx`
    pub references: Vec<Vec<EntryIdx>>,
    /// Every module reached by at least one entry, ascending
    pub reachable: Vec<ModuleIdx>,
}

impl<'a> SplitContext<'a> {
    /// Resolve entries and compute per-entry reachability.
    ///
    /// Traversals run in parallel; reference counts are only assembled once
    /// all of them are done.
    pub fn new(graph: &'a ModuleGraph, entries: &[Entry]) -> Result<Self, SplitError> {
        validate_entries(entries)?;

        let mut roots = Vec::with_capacity(entries.len());
        for entry in entries {
            let resolved = entry
                .roots
                .iter()
                .map(|id| {
                    graph.index_of(id).ok_or_else(|| SplitError::UnknownRoot {
                        entry: entry.name.clone(),
                        module: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            roots.push(resolved);
        }

        let reaches: Vec<Vec<ModuleIdx>> = roots
            .par_iter()
            .map(|entry_roots| graph.reachable_from(entry_roots))
            .collect();

        let mut references = vec![Vec::new(); graph.len()];
        for (e, reach) in reaches.iter().enumerate() {
            for &module in reach {
                references[module].push(e);
            }
        }

        let reachable = (0..graph.len())
            .filter(|&module| !references[module].is_empty())
            .collect();

        let entries = entries
            .iter()
            .zip(roots)
            .zip(reaches)
            .map(|((entry, roots), reach)| ResolvedEntry {
                name: entry.name.clone(),
                roots,
                loading: entry.loading,
                reach,
            })
            .collect();

        Ok(Self {
            graph,
            entries,
            references,
            reachable,
        })
    }

    /// A root of exactly one entry that no other entry reaches stays in
    /// that entry's chunk
    pub fn is_pinned(&self, module: ModuleIdx) -> bool {
        match self.references[module].as_slice() {
            [only] => self.entries[*only].roots.contains(&module),
            _ => false,
        }
    }

    pub fn entry_name(&self, entry: EntryIdx) -> &str {
        &self.entries[entry].name
    }
}

fn validate_entries(entries: &[Entry]) -> Result<(), SplitError> {
    if entries.is_empty() {
        return Err(SplitError::NoEntries);
    }

    let mut names = HashSet::new();
    for entry in entries {
        if !names.insert(entry.name.as_str()) {
            return Err(SplitError::DuplicateEntry(entry.name.clone()));
        }
        if entry.roots.is_empty() {
            return Err(SplitError::EmptyEntry {
                entry: entry.name.clone(),
            });
        }
    }

    Ok(())
}

/// Ownership and classification of one module, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReport {
    pub module: String,
    pub kind: ModuleKind,
    pub size: u64,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub referenced_by: Vec<String>,
}

/// The splitting engine
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    entries: Vec<Entry>,
    options: SplitOptions,
}

impl ChunkSplitter {
    /// Create a splitter, rejecting configurations no graph could satisfy
    pub fn new(entries: Vec<Entry>, options: SplitOptions) -> Result<Self, SplitError> {
        validate_entries(&entries)?;

        for group in &options.cache_groups {
            if let PageScope::Entry(name) = &group.scope {
                if !entries.iter().any(|entry| entry.name == *name) {
                    return Err(SplitError::UnknownScopeEntry {
                        group: group.name.clone(),
                        entry: name.clone(),
                    });
                }
            }
        }

        Ok(Self { entries, options })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Run the full pipeline and produce the chunk manifest
    pub fn split(&self, graph: &ModuleGraph) -> Result<ChunkManifest, SplitError> {
        let start = Instant::now();

        let ctx = SplitContext::new(graph, &self.entries)?;
        info!(
            "Splitting {} modules across {} entries",
            ctx.reachable.len(),
            ctx.entries.len()
        );

        let tracker = IssuerTracker::new(&ctx);
        let groups = &self.options.cache_groups;
        let matcher = CacheGroupMatcher::new(&ctx, groups, &self.options.defaults, &tracker);
        let classes = matcher.classify_all();

        let mut warnings = Vec::new();
        for failure in classes.iter().flat_map(|class| &class.failures) {
            let warning = SplitWarning::PredicateFailed {
                group: groups[failure.group].name.clone(),
                module: graph.module(failure.module).id.clone(),
                message: failure.message.clone(),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        let builder = ChunkGraphBuilder::new(&ctx, groups, &self.options.defaults);
        let mut chunks = builder.build(&classes)?;

        let splitter = SizeThresholdSplitter::new(&ctx, &self.options);
        warnings.extend(splitter.apply(&mut chunks));

        chunks.verify(&ctx)?;

        let namer = OutputNamer::new(&ctx, groups, &self.options.output);
        let manifest = namer.finalize(&chunks, warnings);

        debug!("Split completed in {:?}", start.elapsed());

        Ok(manifest)
    }

    /// Report owner and selected cache group for every reachable module
    pub fn explain(&self, graph: &ModuleGraph) -> Result<Vec<ModuleReport>, SplitError> {
        let ctx = SplitContext::new(graph, &self.entries)?;
        let tracker = IssuerTracker::new(&ctx);
        let groups = &self.options.cache_groups;
        let matcher = CacheGroupMatcher::new(&ctx, groups, &self.options.defaults, &tracker);
        let classes = matcher.classify_all();

        Ok(ctx
            .reachable
            .iter()
            .map(|&idx| {
                let module = graph.module(idx);
                ModuleReport {
                    module: module.id.clone(),
                    kind: module.kind,
                    size: module.size,
                    owner: tracker.owner_name(idx).map(str::to_string),
                    group: classes[idx]
                        .selected
                        .as_ref()
                        .map(|class| groups[class.group].name.clone()),
                    referenced_by: ctx.references[idx]
                        .iter()
                        .map(|&e| ctx.entry_name(e).to_string())
                        .collect(),
                }
            })
            .collect())
    }
}
