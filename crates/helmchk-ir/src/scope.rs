use std::collections::BTreeMap;

use crate::Alts;

/// Variable bindings of one template invocation, as a stack of frames.
///
/// Frame 0 holds `$`. A frame is pushed for every construct that may declare
/// variables and popped when the construct ends.
#[derive(Debug)]
pub(crate) struct Scope {
    frames: Vec<BTreeMap<String, Alts>>,
}

/// Marker returned when assigning to a name no frame declares.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Undeclared;

impl Scope {
    pub(crate) fn new(dollar: Alts) -> Self {
        Self {
            frames: vec![BTreeMap::from([("$".to_string(), dollar)])],
        }
    }

    pub(crate) fn push(&mut self) {
        self.frames.push(BTreeMap::new());
    }

    pub(crate) fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "popped the frame holding `$`");
        self.frames.pop();
    }

    /// `$name := value`. Re-declaring within the same frame keeps the earlier
    /// alternatives alongside the new ones; a nested frame shadows.
    pub(crate) fn declare(&mut self, name: &str, value: Alts) {
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        frame.entry(name.to_string()).or_default().extend(value);
    }

    /// `$name = value`, adding to the binding of the innermost frame that
    /// declares `name`.
    pub(crate) fn assign(&mut self, name: &str, value: Alts) -> Result<(), Undeclared> {
        let binding = self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
            .ok_or(Undeclared)?;
        binding.extend(value);
        Ok(())
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&Alts> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}
