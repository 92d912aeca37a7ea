//! Issuer chain ownership
//!
//! A module is owned by the page whose entry its first-issuer chain leads
//! back to. Chains that loop or lead nowhere make the module unowned, which
//! callers treat as shared.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tracing::trace;

use super::{EntryIdx, SplitContext};
use crate::graph::{Issuer, ModuleIdx};

/// Resolved owner of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Entry(EntryIdx),
    Unowned,
}

impl Owner {
    pub fn entry(self) -> Option<EntryIdx> {
        match self {
            Owner::Entry(e) => Some(e),
            Owner::Unowned => None,
        }
    }
}

/// Memoizing owner resolver, safe to query from parallel workers
pub struct IssuerTracker<'a> {
    ctx: &'a SplitContext<'a>,
    entry_by_name: HashMap<&'a str, EntryIdx>,
    /// Entries listing each root module
    root_entries: HashMap<ModuleIdx, Vec<EntryIdx>>,
    memo: DashMap<ModuleIdx, Owner>,
}

impl<'a> IssuerTracker<'a> {
    pub fn new(ctx: &'a SplitContext<'a>) -> Self {
        let entry_by_name = ctx
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.name.as_str(), idx))
            .collect();

        let mut root_entries: HashMap<ModuleIdx, Vec<EntryIdx>> = HashMap::new();
        for (idx, entry) in ctx.entries.iter().enumerate() {
            for &root in &entry.roots {
                let owners = root_entries.entry(root).or_default();
                if !owners.contains(&idx) {
                    owners.push(idx);
                }
            }
        }

        Self {
            ctx,
            entry_by_name,
            root_entries,
            memo: DashMap::new(),
        }
    }

    /// Name of the entry owning `module`, `None` when unowned
    pub fn owner_name(&self, module: ModuleIdx) -> Option<&'a str> {
        self.resolve_owner(module)
            .entry()
            .map(|e| self.ctx.entries[e].name.as_str())
    }

    /// Walk the first-issuer chain of `module` up to an entry.
    ///
    /// Every node visited is memoized with the walk's result, so each module
    /// is walked at most once across all queries.
    pub fn resolve_owner(&self, module: ModuleIdx) -> Owner {
        if let Some(known) = self.memo.get(&module) {
            return *known;
        }

        let graph = self.ctx.graph;
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        let mut current = module;

        let owner = loop {
            if let Some(known) = self.memo.get(&current) {
                break *known;
            }
            if !visited.insert(current) {
                trace!("Issuer cycle at {}", graph.module(current).id);
                break Owner::Unowned;
            }
            path.push(current);

            match graph.issuers_of(current).first() {
                None => break self.root_owner(current),
                Some(Issuer::Entry(name)) => {
                    break self
                        .entry_by_name
                        .get(name.as_str())
                        .map_or(Owner::Unowned, |&e| Owner::Entry(e));
                }
                Some(Issuer::Dangling(id)) => {
                    trace!("Dangling issuer {} for {}", id, graph.module(current).id);
                    break Owner::Unowned;
                }
                Some(Issuer::Module(parent)) => current = *parent,
            }
        };

        for idx in path {
            self.memo.insert(idx, owner);
        }
        owner
    }

    /// Owner of a chain's topmost module: the entry listing it as a root,
    /// if exactly one does
    fn root_owner(&self, module: ModuleIdx) -> Owner {
        match self.root_entries.get(&module).map(Vec::as_slice) {
            Some([only]) => Owner::Entry(*only),
            _ => Owner::Unowned,
        }
    }
}
