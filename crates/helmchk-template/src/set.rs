use std::collections::BTreeMap;

use crate::ParseError;
use crate::node::Node;
use crate::parse::{Unit, parse};

/// Whether a source file is rendered on its own or only provides definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Rendered by Helm, analyzed as an entry unit.
    Entry,
    /// A partial such as `_helpers.tpl`.
    Partial,
}

/// All units of a chart, addressable by name.
///
/// Every added file becomes a unit named after the file; every `define` and
/// `block` becomes a unit named by its literal name. A later definition of a
/// name replaces the earlier one, unless the later body is empty.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    units: BTreeMap<String, Unit>,
    entries: Vec<String>,
}

/// A body consisting only of whitespace and comments.
fn is_empty_body(body: &[Node]) -> bool {
    body.iter().all(|node| match node {
        Node::Text(text) => text.trim().is_empty(),
        Node::Comment(_) => true,
        _ => false,
    })
}

impl TemplateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `src` as the file `name` and add its units.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if `src` is not a valid template. The set is
    /// left unchanged in that case.
    pub fn add_source(&mut self, name: &str, src: &str, kind: SourceKind) -> Result<(), ParseError> {
        let parsed = parse(name, src)?;
        tracing::trace!(name, defines = parsed.defines.len(), "parsed template source");
        for define in parsed.defines {
            self.add_unit(define);
        }
        self.add_unit(Unit {
            name: name.to_string(),
            body: parsed.body,
        });
        if kind == SourceKind::Entry && !self.entries.iter().any(|entry| entry == name) {
            self.entries.push(name.to_string());
        }
        Ok(())
    }

    /// Add `unit`, replacing an existing unit of the same name unless the new
    /// body is empty.
    pub fn add_unit(&mut self, unit: Unit) {
        if let Some(existing) = self.units.get(&unit.name)
            && is_empty_body(&unit.body)
            && !is_empty_body(&existing.body)
        {
            tracing::trace!(name = %unit.name, "keeping non-empty definition");
            return;
        }
        self.units.insert(unit.name.clone(), unit);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.units.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Entry units in the order their sources were added.
    pub fn entries(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.entries.iter().filter_map(|name| self.units.get(name))
    }

    /// Names of all units, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.units.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
