//! Comparison of the paths a values document defines against the paths the
//! templates read.

mod exceptions;

pub use exceptions::{Exceptions, ExceptionsError};

use std::collections::BTreeSet;
use std::fmt;

use helmchk_core::{Path, PathSet};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Defined in the values document but never read by a template.
    MissingFromTemplates,
    /// Read by a template but not defined in the values document.
    MissingFromValues,
}

/// One path present on one side only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub path: Path,
}

impl Mismatch {
    #[must_use]
    pub fn new(kind: MismatchKind, path: Path) -> Self {
        Self { kind, path }
    }
}

/// The report line, also the form exceptions are written in.
impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MismatchKind::MissingFromTemplates => {
                write!(f, "value missing from templates: {}", self.path)
            }
            MismatchKind::MissingFromValues => {
                write!(f, "value missing from values.yaml: {}", self.path)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Unsuppressed mismatches, in merge order.
    pub mismatches: Vec<Mismatch>,
    /// Mismatches matched by an exception, in merge order.
    pub suppressed: Vec<Mismatch>,
    /// Exceptions that matched no mismatch, sorted.
    pub unused_exceptions: Vec<String>,
}

impl Report {
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl Serialize for Report {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Document<'a> {
            in_sync: bool,
            mismatches: &'a [Mismatch],
            suppressed: &'a [Mismatch],
            unused_exceptions: &'a [String],
        }

        Document {
            in_sync: self.is_in_sync(),
            mismatches: &self.mismatches,
            suppressed: &self.suppressed,
            unused_exceptions: &self.unused_exceptions,
        }
        .serialize(serializer)
    }
}

/// Merge the two sorted, prefix-closed sets and report every path present on
/// one side only.
///
/// A path is not reported while the most recent path present on both sides is
/// an ancestor of it: the templates read that subtree as a whole, or the
/// values document defines it as a whole. The root is present in every
/// non-empty set, so it never covers anything and is never reported itself.
#[must_use]
pub fn diff(values: &PathSet, templates: &PathSet, exceptions: &Exceptions) -> Report {
    let mut values = values.iter().peekable();
    let mut templates = templates.iter().peekable();
    let mut common: Option<&Path> = None;

    let mut report = Report::default();
    let mut used = BTreeSet::new();

    loop {
        let (kind, path) = match (values.peek().copied(), templates.peek().copied()) {
            (None, None) => break,
            (Some(value), Some(template)) if value == template => {
                if !value.is_root() {
                    common = Some(value);
                }
                values.next();
                templates.next();
                continue;
            }
            (Some(value), Some(template)) if value < template => {
                values.next();
                (MismatchKind::MissingFromTemplates, value)
            }
            (Some(value), None) => {
                values.next();
                (MismatchKind::MissingFromTemplates, value)
            }
            (_, Some(template)) => {
                templates.next();
                (MismatchKind::MissingFromValues, template)
            }
        };

        if path.is_root() {
            continue;
        }
        if let Some(common) = common.filter(|common| common.is_ancestor_or_self_of(path)) {
            tracing::trace!(%path, covered_by = %common, "covered");
            continue;
        }

        let mismatch = Mismatch::new(kind, path.clone());
        let line = mismatch.to_string();
        if exceptions.contains(&line) {
            tracing::debug!(%line, "suppressed by exception");
            used.insert(line);
            report.suppressed.push(mismatch);
        } else {
            report.mismatches.push(mismatch);
        }
    }

    report.unused_exceptions = exceptions
        .iter()
        .filter(|line| !used.contains(*line))
        .map(str::to_string)
        .collect();

    tracing::debug!(
        mismatches = report.mismatches.len(),
        suppressed = report.suppressed.len(),
        unused_exceptions = report.unused_exceptions.len(),
        "compared values and templates"
    );
    report
}
