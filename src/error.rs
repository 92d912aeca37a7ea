//! Fatal errors raised by the splitting engine

use thiserror::Error;

/// Errors that abort a split.
///
/// Everything recoverable (cyclic issuer chains, failing cache group
/// predicates, unsatisfiable request budgets) is reported as a
/// [`SplitWarning`](crate::split::SplitWarning) instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("no entries declared")]
    NoEntries,

    #[error("entry '{0}' is declared more than once")]
    DuplicateEntry(String),

    #[error("entry '{entry}' declares no root modules")]
    EmptyEntry { entry: String },

    #[error("entry '{entry}' root '{module}' is not part of the module graph")]
    UnknownRoot { entry: String, module: String },

    #[error("cache group '{group}' is scoped to undeclared entry '{entry}'")]
    UnknownScopeEntry { group: String, entry: String },

    #[error("module '{0}' is declared more than once in the module graph")]
    DuplicateModule(String),

    #[error("module '{module}' depends on unknown module '{dependency}'")]
    UnknownDependency { module: String, dependency: String },

    #[error("internal consistency error: module '{module}' {detail}")]
    ExclusivityViolation { module: String, detail: String },

    #[error("internal consistency error: entry '{entry}' cannot load required module '{module}'")]
    MissingRequiredModule { entry: String, module: String },
}
