//! Consumer containment chain
//!
//! Consumers form a forest through their parent links. Stateful consumers own
//! a [`StateCell`]; structural ones only take part in the chain. The tree is
//! only ever walked upwards, to invalidate ancestors of a subject that just
//! settled.

use reqcheck_core::{ComplianceState, Error, Result, SubjectId};
use std::collections::HashMap;

use crate::state::StateCell;

/// Whether a consumer holds compliance state of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerKind {
    Stateful,
    Structural,
}

#[derive(Debug)]
struct ConsumerEntry {
    parent: Option<SubjectId>,
    cell: Option<StateCell>,
}

impl ConsumerEntry {
    fn new(parent: Option<SubjectId>, kind: ConsumerKind) -> Self {
        let cell = match kind {
            ConsumerKind::Stateful => Some(StateCell::new()),
            ConsumerKind::Structural => None,
        };
        Self { parent, cell }
    }

    fn kind(&self) -> ConsumerKind {
        match self.cell {
            Some(_) => ConsumerKind::Stateful,
            None => ConsumerKind::Structural,
        }
    }
}

/// Registered consumers keyed by subject
#[derive(Debug, Default)]
pub struct ConsumerTree {
    entries: HashMap<SubjectId, ConsumerEntry>,
}

impl ConsumerTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subject` below `parent`, or move it there if already known.
    ///
    /// The parent does not have to be registered yet. Re-attaching with the
    /// same kind keeps the current state; changing the kind starts afresh.
    pub fn attach(
        &mut self,
        subject: SubjectId,
        parent: Option<SubjectId>,
        kind: ConsumerKind,
    ) -> Result<()> {
        if let Some(parent) = &parent {
            if self.would_cycle(&subject, parent) {
                return Err(Error::containment(format!(
                    "attaching '{}' below '{}' would make it its own ancestor",
                    subject, parent
                )));
            }
        }

        match self.entries.get_mut(&subject) {
            Some(entry) if entry.kind() == kind => entry.parent = parent,
            _ => {
                self.entries
                    .insert(subject, ConsumerEntry::new(parent, kind));
            }
        }
        Ok(())
    }

    /// Remove `subject`, returning the state it held.
    ///
    /// The cell is reset first so its pending settle is cancelled. Structural
    /// consumers report `Unknown`. Children keep pointing at the removed
    /// subject, which ends their upward walk there.
    pub fn detach(&mut self, subject: &SubjectId) -> Option<ComplianceState> {
        let mut entry = self.entries.remove(subject)?;
        Some(
            entry
                .cell
                .as_mut()
                .map(StateCell::reset)
                .unwrap_or_default(),
        )
    }

    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.entries.contains_key(subject)
    }

    pub fn kind(&self, subject: &SubjectId) -> Option<ConsumerKind> {
        self.entries.get(subject).map(ConsumerEntry::kind)
    }

    pub fn parent(&self, subject: &SubjectId) -> Option<&SubjectId> {
        self.entries.get(subject)?.parent.as_ref()
    }

    /// State of a stateful consumer
    pub fn state(&self, subject: &SubjectId) -> Option<ComplianceState> {
        self.entries.get(subject)?.cell.as_ref().map(StateCell::state)
    }

    pub fn cell(&self, subject: &SubjectId) -> Option<&StateCell> {
        self.entries.get(subject)?.cell.as_ref()
    }

    pub fn cell_mut(&mut self, subject: &SubjectId) -> Option<&mut StateCell> {
        self.entries.get_mut(subject)?.cell.as_mut()
    }

    /// Cell of `subject`, registering it as a stateful root when unknown.
    ///
    /// Returns `None` for structural consumers.
    pub fn cell_or_register(&mut self, subject: &SubjectId) -> Option<&mut StateCell> {
        if !self.entries.contains_key(subject) {
            tracing::debug!(subject = %subject, "Registering consumer on first event");
        }
        self.entries
            .entry(subject.clone())
            .or_insert_with(|| ConsumerEntry::new(None, ConsumerKind::Stateful))
            .cell
            .as_mut()
    }

    /// Registered ancestors of `subject`, nearest first
    pub fn ancestors(&self, subject: &SubjectId) -> Vec<SubjectId> {
        let mut chain = Vec::new();
        let mut current = self.parent(subject);
        while let Some(parent) = current {
            if !self.entries.contains_key(parent) {
                break;
            }
            chain.push(parent.clone());
            current = self.parent(parent);
        }
        chain
    }

    /// Subjects attached directly below `parent`
    pub fn children_of(&self, parent: &SubjectId) -> Vec<SubjectId> {
        let mut children: Vec<SubjectId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.parent.as_ref() == Some(parent))
            .map(|(subject, _)| subject.clone())
            .collect();
        children.sort();
        children
    }

    /// Reset every stateful ancestor of `subject` to `Unknown`.
    ///
    /// Stops at the first structural ancestor, an unregistered parent, or a
    /// root. Returns each reset subject with the state it had before.
    pub fn invalidate_ancestors(
        &mut self,
        subject: &SubjectId,
    ) -> Vec<(SubjectId, ComplianceState)> {
        let mut reset = Vec::new();
        let mut next = self.parent(subject).cloned();

        while let Some(ancestor) = next {
            let Some(entry) = self.entries.get_mut(&ancestor) else {
                break;
            };
            let Some(cell) = entry.cell.as_mut() else {
                break;
            };
            let previous = cell.reset();
            next = entry.parent.clone();
            reset.push((ancestor, previous));
        }

        reset
    }

    /// Reset every stateful subject that is pending, or has a settle waiting,
    /// to `Unknown`. Returns the reset subjects, sorted, with their previous
    /// states.
    pub fn reset_pending(&mut self) -> Vec<(SubjectId, ComplianceState)> {
        let mut reset: Vec<_> = self
            .entries
            .iter_mut()
            .filter_map(|(subject, entry)| {
                let cell = entry.cell.as_mut()?;
                if !cell.state().is_pending() && !cell.has_pending() {
                    return None;
                }
                Some((subject.clone(), cell.reset()))
            })
            .collect();
        reset.sort_by(|a, b| a.0.cmp(&b.0));
        reset
    }

    /// Every registered subject, in no particular order
    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn would_cycle(&self, subject: &SubjectId, parent: &SubjectId) -> bool {
        let mut current = Some(parent);
        while let Some(ancestor) = current {
            if ancestor == subject {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SubjectId {
        SubjectId::new(s)
    }

    /// c below b below a, all stateful
    fn chain() -> ConsumerTree {
        let mut tree = ConsumerTree::new();
        tree.attach(id("a"), None, ConsumerKind::Stateful).unwrap();
        tree.attach(id("b"), Some(id("a")), ConsumerKind::Stateful).unwrap();
        tree.attach(id("c"), Some(id("b")), ConsumerKind::Stateful).unwrap();
        tree
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let tree = chain();
        assert_eq!(tree.ancestors(&id("c")), vec![id("b"), id("a")]);
        assert!(tree.ancestors(&id("a")).is_empty());
    }

    #[test]
    fn test_invalidate_resets_whole_stateful_chain() {
        let mut tree = chain();
        tree.cell_mut(&id("a")).unwrap().set(ComplianceState::Compliant);
        tree.cell_mut(&id("b")).unwrap().set(ComplianceState::NonCompliant);

        let reset = tree.invalidate_ancestors(&id("c"));
        assert_eq!(
            reset,
            vec![
                (id("b"), ComplianceState::NonCompliant),
                (id("a"), ComplianceState::Compliant),
            ]
        );
        assert_eq!(tree.state(&id("a")), Some(ComplianceState::Unknown));
        assert_eq!(tree.state(&id("b")), Some(ComplianceState::Unknown));
    }

    #[test]
    fn test_invalidate_stops_at_structural_ancestor() {
        let mut tree = ConsumerTree::new();
        tree.attach(id("top"), None, ConsumerKind::Stateful).unwrap();
        tree.attach(id("group"), Some(id("top")), ConsumerKind::Structural).unwrap();
        tree.attach(id("row"), Some(id("group")), ConsumerKind::Stateful).unwrap();
        tree.cell_mut(&id("top")).unwrap().set(ComplianceState::Compliant);

        assert!(tree.invalidate_ancestors(&id("row")).is_empty());
        assert_eq!(tree.state(&id("top")), Some(ComplianceState::Compliant));
    }

    #[test]
    fn test_invalidate_stops_at_unregistered_parent() {
        let mut tree = ConsumerTree::new();
        tree.attach(id("row"), Some(id("missing")), ConsumerKind::Stateful).unwrap();
        assert!(tree.invalidate_ancestors(&id("row")).is_empty());
        assert!(tree.ancestors(&id("row")).is_empty());
    }

    #[test]
    fn test_invalidate_cancels_ancestor_pending_settle() {
        let mut tree = chain();
        let cell = tree.cell_mut(&id("b")).unwrap();
        cell.set(ComplianceState::Calculating);
        cell.arm(ComplianceState::Compliant);

        tree.invalidate_ancestors(&id("c"));
        assert!(!tree.cell(&id("b")).unwrap().has_pending());
    }

    #[test]
    fn test_reset_pending_only_touches_pending_subjects() {
        let mut tree = chain();
        tree.attach(id("shell"), None, ConsumerKind::Structural).unwrap();
        tree.cell_mut(&id("a")).unwrap().set(ComplianceState::Compliant);
        tree.cell_mut(&id("b")).unwrap().set(ComplianceState::Indeterminate);
        let cell = tree.cell_mut(&id("c")).unwrap();
        cell.set(ComplianceState::Calculating);
        cell.arm(ComplianceState::NonCompliant);

        assert_eq!(
            tree.reset_pending(),
            vec![
                (id("b"), ComplianceState::Indeterminate),
                (id("c"), ComplianceState::Calculating),
            ]
        );
        assert!(!tree.cell(&id("c")).unwrap().has_pending());
        assert_eq!(tree.state(&id("a")), Some(ComplianceState::Compliant));
        assert!(tree.reset_pending().is_empty());
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut tree = chain();
        let err = tree
            .attach(id("a"), Some(id("c")), ConsumerKind::Stateful)
            .unwrap_err();
        assert!(matches!(err, Error::Containment(_)));
        assert!(tree
            .attach(id("a"), Some(id("a")), ConsumerKind::Stateful)
            .is_err());
        assert_eq!(tree.parent(&id("a")), None);
    }

    #[test]
    fn test_reattach_same_kind_keeps_state() {
        let mut tree = chain();
        tree.cell_mut(&id("c")).unwrap().set(ComplianceState::Compliant);

        tree.attach(id("c"), Some(id("a")), ConsumerKind::Stateful).unwrap();
        assert_eq!(tree.state(&id("c")), Some(ComplianceState::Compliant));
        assert_eq!(tree.parent(&id("c")), Some(&id("a")));

        tree.attach(id("c"), Some(id("a")), ConsumerKind::Structural).unwrap();
        assert_eq!(tree.state(&id("c")), None);
        assert_eq!(tree.kind(&id("c")), Some(ConsumerKind::Structural));
    }

    #[test]
    fn test_detach_returns_previous_state() {
        let mut tree = chain();
        tree.cell_mut(&id("b")).unwrap().set(ComplianceState::NonCompliant);

        assert_eq!(tree.detach(&id("b")), Some(ComplianceState::NonCompliant));
        assert_eq!(tree.detach(&id("b")), None);
        assert!(tree.ancestors(&id("c")).is_empty());
    }

    #[test]
    fn test_cell_or_register_creates_stateful_root() {
        let mut tree = ConsumerTree::new();
        assert!(tree.cell_or_register(&id("new")).is_some());
        assert_eq!(tree.kind(&id("new")), Some(ConsumerKind::Stateful));
        assert_eq!(tree.parent(&id("new")), None);

        tree.attach(id("shell"), None, ConsumerKind::Structural).unwrap();
        assert!(tree.cell_or_register(&id("shell")).is_none());
    }

    #[test]
    fn test_children_of() {
        let mut tree = chain();
        tree.attach(id("d"), Some(id("b")), ConsumerKind::Structural).unwrap();
        assert_eq!(tree.children_of(&id("b")), vec![id("c"), id("d")]);
        assert!(tree.children_of(&id("c")).is_empty());
    }
}
