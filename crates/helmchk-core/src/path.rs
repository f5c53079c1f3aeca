use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Textual marker of the values root.
pub const ROOT_MARKER: &str = "$";

/// Textual marker of "any element of a sequence".
pub const WILDCARD_MARKER: &str = "[*]";

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A literal mapping key or template field name.
    Field(String),
    /// Any element of a sequence or iteration.
    Wildcard,
}

impl Segment {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Segment::Field(name) => name,
            Segment::Wildcard => WILDCARD_MARKER,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Segment::Field(_) => 0,
            Segment::Wildcard => 1,
        }
    }
}

// Segments order by their rendered text so that sorted path sets follow the
// order of the rendered report.
impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str()
            .cmp(other.as_str())
            .then_with(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location inside the values document, relative to the values root.
///
/// The root itself is the empty path and renders as `.$`; every segment is
/// rendered with a leading `.`, e.g. `.$.image.pullSecrets.[*].name`.
///
/// Paths compare segment by segment, so a path always sorts directly before
/// all of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The values root (`.$`).
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    #[must_use]
    pub fn child(&self, field: impl Into<String>) -> Self {
        self.join(Segment::Field(field.into()))
    }

    /// The path of an arbitrary element of the sequence at `self`.
    #[must_use]
    pub fn wildcard(&self) -> Self {
        self.join(Segment::Wildcard)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// All prefixes of this path, from the root up to and including `self`.
    pub fn prefixes(&self) -> impl DoubleEndedIterator<Item = Path> + '_ {
        (0..=self.0.len()).map(|len| Self(self.0[..len].to_vec()))
    }

    /// Strict ancestors of this path, from the root down to the parent.
    pub fn ancestors(&self) -> impl DoubleEndedIterator<Item = Path> + '_ {
        (0..self.0.len()).map(|len| Self(self.0[..len].to_vec()))
    }

    #[must_use]
    pub fn is_ancestor_or_self_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{ROOT_MARKER}")?;
        for segment in &self.0 {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    #[error("path {0:?} does not start with the root marker `.$`")]
    MissingRoot(String),
    #[error("path {0:?} contains an empty segment")]
    EmptySegment(String),
}

impl FromStr for Path {
    type Err = PathParseError;

    /// Parse the rendered form of a path.
    ///
    /// Field names containing `.` cannot be recovered from the rendered form
    /// and are split into several segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(".$")
            .ok_or_else(|| PathParseError::MissingRoot(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let rest = rest
            .strip_prefix('.')
            .ok_or_else(|| PathParseError::MissingRoot(s.to_string()))?;

        let mut segments = Vec::new();
        for raw in rest.split('.') {
            let segment = match raw {
                "" => return Err(PathParseError::EmptySegment(s.to_string())),
                WILDCARD_MARKER => Segment::Wildcard,
                name => Segment::Field(name.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self(segments))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
