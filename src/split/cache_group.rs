//! Cache groups: prioritized extraction rules and the matcher that applies them

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::issuer::{IssuerTracker, Owner};
use super::{EntryIdx, GroupPolicy, SplitContext};
use crate::graph::{Module, ModuleIdx, ModuleKind};

/// Index of a cache group in declaration order
pub type GroupIdx = usize;

/// Matches ids of modules installed from a package registry
pub static NODE_MODULES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\\/]node_modules[\\/]").expect("static pattern"));

/// Raised by a predicate that cannot decide; the group is skipped for that module
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PredicateError(pub String);

/// What a predicate sees when deciding whether a module belongs to a group
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub module: &'a Module,
    /// Entry the module's issuer chain resolves to, `None` when unowned
    pub owner: Option<&'a str>,
    /// Number of entries that reach the module
    pub references: usize,
}

/// A cache group test
pub trait ModulePredicate: Send + Sync {
    fn test(&self, candidate: &Candidate<'_>) -> Result<bool, PredicateError>;
}

impl<F> ModulePredicate for F
where
    F: Fn(&Candidate<'_>) -> Result<bool, PredicateError> + Send + Sync,
{
    fn test(&self, candidate: &Candidate<'_>) -> Result<bool, PredicateError> {
        self(candidate)
    }
}

/// Declarative test built from configuration; every set field must hold
#[derive(Debug, Clone, Default)]
pub struct ModuleTest {
    pub kind: Option<ModuleKind>,
    pub id_pattern: Option<Regex>,
    pub min_module_size: Option<u64>,
}

impl ModuleTest {
    /// Matches every module
    pub fn any() -> Self {
        Self::default()
    }

    pub fn kind(kind: ModuleKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn id_pattern(pattern: Regex) -> Self {
        Self {
            id_pattern: Some(pattern),
            ..Self::default()
        }
    }
}

impl ModulePredicate for ModuleTest {
    fn test(&self, candidate: &Candidate<'_>) -> Result<bool, PredicateError> {
        let module = candidate.module;
        Ok(self.kind.map_or(true, |kind| module.kind == kind)
            && self
                .id_pattern
                .as_ref()
                .map_or(true, |pattern| pattern.is_match(&module.id))
            && self.min_module_size.map_or(true, |min| module.size >= min))
    }
}

/// Restricts a group to modules owned by a particular page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScope {
    /// Not page-specific; modules are grouped by the pages sharing them
    Shared,
    /// Only modules owned by the named entry
    Entry(String),
    /// Any owned module, one chunk per owner
    EachOwner,
}

/// A named, prioritized extraction rule
#[derive(Clone)]
pub struct CacheGroup {
    pub name: String,
    pub predicate: Arc<dyn ModulePredicate>,
    pub priority: i32,
    /// Bypass size and request thresholds
    pub enforce: bool,
    pub min_size: Option<u64>,
    pub min_chunks: Option<usize>,
    pub max_initial_requests: Option<usize>,
    pub max_async_requests: Option<usize>,
    /// Fixed output chunk name
    pub chunk_name: Option<String>,
    pub scope: PageScope,
    /// Fold this group's chunks into an existing extraction loaded by the
    /// same pages instead of emitting another one
    pub reuse_existing_chunk: bool,
}

impl fmt::Debug for CacheGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheGroup")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enforce", &self.enforce)
            .field("min_size", &self.min_size)
            .field("min_chunks", &self.min_chunks)
            .field("chunk_name", &self.chunk_name)
            .field("scope", &self.scope)
            .field("reuse_existing_chunk", &self.reuse_existing_chunk)
            .finish_non_exhaustive()
    }
}

impl CacheGroup {
    pub fn new(name: impl Into<String>, predicate: impl ModulePredicate + 'static) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            priority: 0,
            enforce: false,
            min_size: None,
            min_chunks: None,
            max_initial_requests: None,
            max_async_requests: None,
            chunk_name: None,
            scope: PageScope::Shared,
            reuse_existing_chunk: false,
        }
    }

    /// Style modules owned by `entry`, always extracted under the entry's name
    pub fn page_styles(name: impl Into<String>, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        Self::new(name, ModuleTest::kind(ModuleKind::Style))
            .chunk_name(entry.clone())
            .scope(PageScope::Entry(entry))
            .enforce(true)
    }

    /// `defaultVendors`: registry packages
    pub fn default_vendors() -> Self {
        Self::new("defaultVendors", ModuleTest::id_pattern((*NODE_MODULES).clone())).priority(-10)
    }

    /// `default`: anything shared by at least two pages
    pub fn default_shared() -> Self {
        Self::new("default", ModuleTest::any())
            .priority(-20)
            .min_chunks(2)
            .reuse_existing_chunk(true)
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn enforce(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    pub fn min_size(mut self, min_size: u64) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn min_chunks(mut self, min_chunks: usize) -> Self {
        self.min_chunks = Some(min_chunks);
        self
    }

    pub fn max_initial_requests(mut self, max: usize) -> Self {
        self.max_initial_requests = Some(max);
        self
    }

    pub fn max_async_requests(mut self, max: usize) -> Self {
        self.max_async_requests = Some(max);
        self
    }

    pub fn chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: PageScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn reuse_existing_chunk(mut self, reuse: bool) -> Self {
        self.reuse_existing_chunk = reuse;
        self
    }

    /// Thresholds for this group, unset fields falling back to `defaults`
    pub fn policy(&self, defaults: &GroupPolicy) -> GroupPolicy {
        GroupPolicy {
            min_size: self.min_size.unwrap_or(defaults.min_size),
            min_chunks: self.min_chunks.unwrap_or(defaults.min_chunks),
            max_initial_requests: self
                .max_initial_requests
                .unwrap_or(defaults.max_initial_requests),
            max_async_requests: self.max_async_requests.unwrap_or(defaults.max_async_requests),
        }
    }
}

/// Which chunk of a group a module goes to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// The page owning the module
    Owner(EntryIdx),
    /// The group's fixed chunk name
    Named,
    /// The exact set of pages reaching the module (sorted)
    Entries(Vec<EntryIdx>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub group: GroupIdx,
    pub target: Target,
}

/// A predicate that failed while classifying a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateFailure {
    pub group: GroupIdx,
    pub module: ModuleIdx,
    pub message: String,
}

/// Result of classifying one module
#[derive(Debug, Clone, Default)]
pub struct ModuleClass {
    pub selected: Option<Classification>,
    pub failures: Vec<PredicateFailure>,
}

/// Evaluates the ordered group list against each module
pub struct CacheGroupMatcher<'a> {
    ctx: &'a SplitContext<'a>,
    groups: &'a [CacheGroup],
    policies: Vec<GroupPolicy>,
    tracker: &'a IssuerTracker<'a>,
}

impl<'a> CacheGroupMatcher<'a> {
    pub fn new(
        ctx: &'a SplitContext<'a>,
        groups: &'a [CacheGroup],
        defaults: &GroupPolicy,
        tracker: &'a IssuerTracker<'a>,
    ) -> Self {
        let policies = groups.iter().map(|group| group.policy(defaults)).collect();
        Self {
            ctx,
            groups,
            policies,
            tracker,
        }
    }

    /// Classify every reachable module. Result is indexed by `ModuleIdx`.
    ///
    /// Needs the global reference counts, so it may only run once every
    /// entry traversal has finished.
    pub fn classify_all(&self) -> Vec<ModuleClass> {
        let classified: Vec<(ModuleIdx, ModuleClass)> = self
            .ctx
            .reachable
            .par_iter()
            .map(|&module| (module, self.classify(module)))
            .collect();

        let mut classes = vec![ModuleClass::default(); self.ctx.graph.len()];
        for (module, class) in classified {
            classes[module] = class;
        }
        classes
    }

    /// Pick the highest-priority matching group for `module`; ties go to
    /// the group declared first
    pub fn classify(&self, module: ModuleIdx) -> ModuleClass {
        let mut class = ModuleClass::default();
        if self.ctx.is_pinned(module) {
            return class;
        }

        let references = &self.ctx.references[module];
        let owner = self.tracker.resolve_owner(module);
        let candidate = Candidate {
            module: self.ctx.graph.module(module),
            owner: owner.entry().map(|e| self.ctx.entries[e].name.as_str()),
            references: references.len(),
        };

        let mut best: Option<(GroupIdx, Target)> = None;
        for (idx, group) in self.groups.iter().enumerate() {
            if references.len() < self.policies[idx].min_chunks {
                continue;
            }

            let Some(target) = self.target_for(group, owner, references) else {
                continue;
            };

            match group.predicate.test(&candidate) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    debug!(
                        "Cache group '{}' failed on {}: {}",
                        group.name, candidate.module.id, err
                    );
                    class.failures.push(PredicateFailure {
                        group: idx,
                        module,
                        message: err.to_string(),
                    });
                    continue;
                }
            }

            let better = match &best {
                None => true,
                Some((current, _)) => group.priority > self.groups[*current].priority,
            };
            if better {
                best = Some((idx, target));
            }
        }

        class.selected = best.map(|(group, target)| Classification { group, target });
        class
    }

    /// Target chunk for `group`, or `None` when the module's page identity
    /// rules the group out
    fn target_for(&self, group: &CacheGroup, owner: Owner, references: &[EntryIdx]) -> Option<Target> {
        match &group.scope {
            PageScope::Shared if group.chunk_name.is_some() => Some(Target::Named),
            PageScope::Shared => Some(Target::Entries(references.to_vec())),
            PageScope::Entry(name) => match owner {
                Owner::Entry(e) if self.ctx.entries[e].name == *name => Some(Target::Owner(e)),
                _ => None,
            },
            PageScope::EachOwner => owner.entry().map(Target::Owner),
        }
    }
}
