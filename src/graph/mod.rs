//! Module graph data structures
//!
//! The graph is produced by an external resolver; this crate only reads it.
//! Modules are stored in an arena and referenced by [`ModuleIdx`].

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Index of a module inside a [`ModuleGraph`]
pub type ModuleIdx = usize;

/// Kinds of modules the splitter distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Script,
    Style,
    Asset,
}

impl ModuleKind {
    /// Determine module kind from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "ts" | "mts" | "cts" | "jsx" | "tsx" | "json" => {
                ModuleKind::Script
            }
            "css" | "scss" | "sass" | "less" => ModuleKind::Style,
            _ => ModuleKind::Asset,
        }
    }

    /// Determine module kind from a module id, treating extensionless ids
    /// (bare package specifiers) as scripts
    pub fn detect(id: &str) -> Self {
        let file = id.rsplit(['/', '\\']).next().unwrap_or(id);
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => ModuleKind::Script,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Script => "script",
            ModuleKind::Style => "style",
            ModuleKind::Asset => "asset",
        }
    }
}

/// A reference to whatever caused a module to be included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuerRef {
    /// Imported by another module
    Module(String),
    /// Listed as a root of an entry
    Entry(String),
}

/// An issuer reference resolved against the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuer {
    Module(ModuleIdx),
    Entry(String),
    /// Points at a module id the graph does not contain
    Dangling(String),
}

/// A module in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModuleRecord")]
pub struct Module {
    /// Resolved module identifier (usually a path)
    pub id: String,

    /// Module kind
    pub kind: ModuleKind,

    /// Size in bytes after transformation
    pub size: u64,

    /// Content fingerprint supplied by the loader
    pub fingerprint: String,

    /// Imported module ids, in import order
    pub dependencies: Vec<String>,

    /// Issuers, the first one being the importer that caused inclusion
    pub issuers: Vec<IssuerRef>,
}

/// Serialized form of a module; `kind` and `fingerprint` may be omitted and
/// are then derived from the id
#[derive(Deserialize)]
struct ModuleRecord {
    id: String,
    #[serde(default)]
    kind: Option<ModuleKind>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    fingerprint: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    issuers: Vec<IssuerRef>,
}

impl From<ModuleRecord> for Module {
    fn from(record: ModuleRecord) -> Self {
        let kind = record.kind.unwrap_or_else(|| ModuleKind::detect(&record.id));
        let fingerprint = record.fingerprint.unwrap_or_else(|| record.id.clone());
        Self {
            id: record.id,
            kind,
            size: record.size,
            fingerprint,
            dependencies: record.dependencies,
            issuers: record.issuers,
        }
    }
}

impl Module {
    pub fn new(id: impl Into<String>, kind: ModuleKind, size: u64) -> Self {
        let id = id.into();
        Self {
            fingerprint: id.clone(),
            id,
            kind,
            size,
            dependencies: Vec::new(),
            issuers: Vec::new(),
        }
    }

    pub fn script(id: impl Into<String>, size: u64) -> Self {
        Self::new(id, ModuleKind::Script, size)
    }

    pub fn style(id: impl Into<String>, size: u64) -> Self {
        Self::new(id, ModuleKind::Style, size)
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn issued_by(mut self, module: impl Into<String>) -> Self {
        self.issuers.push(IssuerRef::Module(module.into()));
        self
    }

    pub fn issued_by_entry(mut self, entry: impl Into<String>) -> Self {
        self.issuers.push(IssuerRef::Entry(entry.into()));
        self
    }
}

/// How an entry is loaded by its page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loading {
    /// Loaded with the page, budgeted by `max_initial_requests`
    #[default]
    Initial,
    /// Loaded on demand, budgeted by `max_async_requests`
    Async,
}

/// A named page entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub roots: Vec<String>,
    pub loading: Loading,
}

impl Entry {
    pub fn new<I, S>(name: impl Into<String>, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roots: roots.into_iter().map(Into::into).collect(),
            loading: Loading::Initial,
        }
    }

    pub fn with_loading(mut self, loading: Loading) -> Self {
        self.loading = loading;
        self
    }
}

/// On-disk dump of a resolved module graph
#[derive(Debug, Deserialize)]
struct GraphDump {
    modules: Vec<Module>,
}

/// The module dependency graph
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// All modules indexed by their position
    modules: Vec<Module>,

    /// Map from module id to index
    id_to_idx: HashMap<String, ModuleIdx>,

    /// Resolved dependency edges, in import order
    edges: Vec<Vec<ModuleIdx>>,

    /// Resolved issuer references, first issuer first
    issuers: Vec<Vec<Issuer>>,
}

impl ModuleGraph {
    /// Build a graph, resolving every dependency and issuer reference
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, SplitError> {
        let mut id_to_idx = HashMap::with_capacity(modules.len());
        for (idx, module) in modules.iter().enumerate() {
            if id_to_idx.insert(module.id.clone(), idx).is_some() {
                return Err(SplitError::DuplicateModule(module.id.clone()));
            }
        }

        let mut edges = Vec::with_capacity(modules.len());
        let mut issuers = Vec::with_capacity(modules.len());

        for module in &modules {
            let mut deps = Vec::with_capacity(module.dependencies.len());
            let mut seen = HashSet::new();
            for dep in &module.dependencies {
                let dep_idx = *id_to_idx.get(dep).ok_or_else(|| SplitError::UnknownDependency {
                    module: module.id.clone(),
                    dependency: dep.clone(),
                })?;
                if seen.insert(dep_idx) {
                    deps.push(dep_idx);
                }
            }
            edges.push(deps);

            issuers.push(
                module
                    .issuers
                    .iter()
                    .map(|issuer| match issuer {
                        IssuerRef::Module(id) => id_to_idx
                            .get(id)
                            .map(|&idx| Issuer::Module(idx))
                            .unwrap_or_else(|| Issuer::Dangling(id.clone())),
                        IssuerRef::Entry(name) => Issuer::Entry(name.clone()),
                    })
                    .collect(),
            );
        }

        Ok(Self {
            modules,
            id_to_idx,
            edges,
            issuers,
        })
    }

    /// Parse a JSON graph dump (`{"modules": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: GraphDump =
            serde_json::from_str(json).context("Failed to parse module graph JSON")?;
        let graph = Self::from_modules(dump.modules).context("Invalid module graph")?;
        Ok(graph)
    }

    /// Get module index from id
    pub fn index_of(&self, id: &str) -> Option<ModuleIdx> {
        self.id_to_idx.get(id).copied()
    }

    /// Get a module by index
    pub fn module(&self, idx: ModuleIdx) -> &Module {
        &self.modules[idx]
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleIdx, &Module)> {
        self.modules.iter().enumerate()
    }

    pub fn dependencies_of(&self, idx: ModuleIdx) -> &[ModuleIdx] {
        &self.edges[idx]
    }

    pub fn issuers_of(&self, idx: ModuleIdx) -> &[Issuer] {
        &self.issuers[idx]
    }

    pub fn kind_of(&self, idx: ModuleIdx) -> ModuleKind {
        self.modules[idx].kind
    }

    pub fn size_of(&self, idx: ModuleIdx) -> u64 {
        self.modules[idx].size
    }

    pub fn fingerprint_of(&self, idx: ModuleIdx) -> &str {
        &self.modules[idx].fingerprint
    }

    /// Get all modules reachable from the given roots (BFS, roots included)
    pub fn reachable_from(&self, roots: &[ModuleIdx]) -> Vec<ModuleIdx> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        for &root in roots {
            if visited.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(idx) = queue.pop_front() {
            result.push(idx);

            for &dep in &self.edges[idx] {
                if visited.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }

        result
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
