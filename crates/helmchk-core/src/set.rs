use std::collections::BTreeSet;

use serde::Serialize;

use crate::Path;

/// An ordered, prefix-closed set of [`Path`]s.
///
/// Every insertion also inserts all ancestors of the inserted path, so the
/// set can never be observed with a member whose ancestors are missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathSet(BTreeSet<Path>);

impl PathSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` together with all of its ancestors.
    ///
    /// Returns `true` if `path` itself was not yet a member.
    pub fn insert(&mut self, path: Path) -> bool {
        if self.0.contains(&path) {
            return false;
        }
        // Walk from the longest prefix down; once a prefix is present all of
        // its ancestors are present as well.
        for prefix in path.prefixes().rev() {
            if !self.0.insert(prefix) {
                break;
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, Path> {
        self.0.iter()
    }

    /// Whether every strict prefix of every member is also a member.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0
            .iter()
            .all(|path| path.parent().is_none_or(|parent| self.0.contains(&parent)))
    }

    /// Rendered form of every member, in sorted order.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

/// Complete `paths` so that every ancestor of every member is a member.
///
/// `close(close(s)) == close(s)` for any input.
pub fn close<I: IntoIterator<Item = Path>>(paths: I) -> PathSet {
    paths.into_iter().collect()
}

impl FromIterator<Path> for PathSet {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Path> for PathSet {
    fn extend<T: IntoIterator<Item = Path>>(&mut self, iter: T) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl IntoIterator for PathSet {
    type Item = Path;
    type IntoIter = std::collections::btree_set::IntoIter<Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a Path;
    type IntoIter = std::collections::btree_set::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
