mod funcs;
mod scope;
mod walker;

pub use walker::ScopedPathExtractor;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use helmchk_core::{Path, PathSet};
use helmchk_template::{Pos, TemplateSet};

// ---------------------------------------------------------------------------
// Symbolic values
// ---------------------------------------------------------------------------

/// What an expression may evaluate to, as far as values paths are concerned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sym {
    /// Helm's top-level object (`.Values`, `.Release`, `.Chart`, ...).
    TopLevel,
    /// A location in the values document.
    Values(Path),
    /// A dictionary built by `dict`, mapping keys to their alternatives.
    Dict(BTreeMap<String, Alts>),
    /// A string literal, kept for `index`/`dict` keys and template names.
    Str(String),
    /// An integer literal, an index into a list.
    Int,
    /// Anything else.
    Opaque,
}

/// The set of values an expression may take across all branches.
pub type Alts = BTreeSet<Sym>;

impl Sym {
    #[must_use]
    pub fn alone(self) -> Alts {
        BTreeSet::from([self])
    }

    #[must_use]
    pub fn as_values_path(&self) -> Option<&Path> {
        match self {
            Sym::Values(path) => Some(path),
            _ => None,
        }
    }

    /// Whether `self` is `base` grown by recursion: a descendant values path,
    /// a dictionary whose every entry extends the same entry of `base`, or a
    /// dictionary that holds such a value.
    #[must_use]
    pub fn extends(&self, base: &Sym) -> bool {
        if self == base {
            return true;
        }
        match (self, base) {
            (Sym::Values(path), Sym::Values(base)) => base.is_ancestor_or_self_of(path),
            (Sym::Dict(entries), _) => {
                let pointwise = match base {
                    Sym::Dict(base) => {
                        entries.len() == base.len()
                            && entries.iter().all(|(key, alts)| {
                                base.get(key).is_some_and(|base| {
                                    alts.iter().all(|sym| base.iter().any(|b| sym.extends(b)))
                                })
                            })
                    }
                    _ => false,
                };
                pointwise || entries.values().flatten().any(|sym| sym.extends(base))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::TopLevel => f.write_str("<top-level>"),
            Sym::Values(path) => write!(f, "{path}"),
            Sym::Dict(entries) => {
                f.write_str("dict(")?;
                for (idx, key) in entries.keys().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(key)?;
                }
                f.write_str(")")
            }
            Sym::Str(value) => write!(f, "{value:?}"),
            Sym::Int => f.write_str("<int>"),
            Sym::Opaque => f.write_str("<opaque>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("undefined variable {name} in template {unit} at {pos}")]
    UndefinedVariable { name: String, unit: String, pos: Pos },

    #[error("assignment to undeclared variable {name} in template {unit}")]
    UndeclaredAssignment { name: String, unit: String },
}

/// What `.` and `$` denote when an entry unit starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryContext {
    /// Helm's top-level object: values are read through `.Values`.
    #[default]
    TopLevel,
    /// The values root itself: `.foo` reads `.$.foo`.
    Values,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
    /// Field of the top-level object that holds the values document.
    pub values_field: String,
    pub entry_context: EntryContext,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            values_field: "Values".to_string(),
            entry_context: EntryContext::TopLevel,
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Extracts the values paths a template set reads.
pub trait PathExtractor {
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] if a template refers to a variable that
    /// is not in scope.
    fn extract(&self, templates: &TemplateSet) -> Result<PathSet, ResolutionError>;
}

/// Every values path read by the entry units of `templates`, prefix-closed.
///
/// # Errors
///
/// Returns a [`ResolutionError`] if a template refers to a variable that is
/// not in scope.
pub fn extract_template_paths(templates: &TemplateSet) -> Result<PathSet, ResolutionError> {
    ScopedPathExtractor::default().extract(templates)
}
