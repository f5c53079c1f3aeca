//! Value paths shared by the values extractor, the template extractor and the differ.

mod path;
mod set;

pub use path::{Path, PathParseError, ROOT_MARKER, Segment, WILDCARD_MARKER};
pub use set::{PathSet, close};

#[cfg(test)]
mod tests;
