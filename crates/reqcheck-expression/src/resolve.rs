//! Free versus nested expression resolution

use reqcheck_core::{NodeId, Result};
use std::collections::HashSet;

use crate::collection::ExpressionCollection;

/// Every node of the collection that no other node references as a direct
/// term, in collection order.
pub fn resolve_top_level(collection: &ExpressionCollection) -> Vec<NodeId> {
    let referenced: HashSet<NodeId> = collection
        .iter()
        .flat_map(|(_, node)| node.terms().iter().copied())
        .collect();

    collection
        .ids()
        .filter(|id| !referenced.contains(id))
        .collect()
}

/// The expressions a consumer editing `subject` may pick from: its own direct
/// terms, followed by every free relational leaf not already among them.
pub fn resolve_consumer_scope(
    collection: &ExpressionCollection,
    subject: NodeId,
) -> Result<Vec<NodeId>> {
    let own_terms = collection.node(subject)?.terms();

    let mut seen: HashSet<NodeId> = HashSet::with_capacity(own_terms.len());
    let mut scope = Vec::with_capacity(own_terms.len());

    for &term in own_terms {
        if seen.insert(term) {
            scope.push(term);
        }
    }

    for id in resolve_top_level(collection) {
        let is_relational = collection.get(id).is_some_and(|node| node.is_relational());
        if is_relational && seen.insert(id) {
            scope.push(id);
        }
    }

    Ok(scope)
}

impl ExpressionCollection {
    /// See [`resolve_top_level`]
    pub fn top_level(&self) -> Vec<NodeId> {
        resolve_top_level(self)
    }

    /// See [`resolve_consumer_scope`]
    pub fn consumer_scope(&self, subject: NodeId) -> Result<Vec<NodeId>> {
        resolve_consumer_scope(self, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// XOR over (OR r1 r2) and (AND r3 r4), NOT over the XOR, plus a free leaf
    fn sample() -> (ExpressionCollection, [NodeId; 9]) {
        let mut c = ExpressionCollection::new();
        let r1 = c.add_relational("R1");
        let r2 = c.add_relational("R2");
        let or = c.add_or([r1, r2]).unwrap();
        let r3 = c.add_relational("R3");
        let r4 = c.add_relational("R4");
        let and = c.add_and([r3, r4]).unwrap();
        let xor = c.add_xor([or, and]).unwrap();
        let not = c.add_not(xor).unwrap();
        let free = c.add_relational("FREE");
        (c, [r1, r2, or, r3, r4, and, xor, not, free])
    }

    #[test]
    fn test_top_level_keeps_only_unreferenced_nodes() {
        let (c, [_, _, _, _, _, _, _, not, free]) = sample();
        assert_eq!(resolve_top_level(&c), vec![not, free]);
    }

    #[test]
    fn test_top_level_of_flat_collection_is_everything() {
        let mut c = ExpressionCollection::new();
        let a = c.add_relational("A");
        let b = c.add_relational("B");
        assert_eq!(c.top_level(), vec![a, b]);
    }

    #[test]
    fn test_scope_of_not_is_its_term_plus_free_leaves() {
        let (c, [_, _, _, _, _, _, xor, not, free]) = sample();
        assert_eq!(resolve_consumer_scope(&c, not).unwrap(), vec![xor, free]);
    }

    #[test]
    fn test_scope_of_composite_lists_terms_first() {
        let (c, [r1, r2, or, ..]) = sample();
        let free = NodeId::new(8);
        assert_eq!(c.consumer_scope(or).unwrap(), vec![r1, r2, free]);
    }

    #[test]
    fn test_scope_deduplicates_repeated_terms() {
        let mut c = ExpressionCollection::new();
        let a = c.add_relational("A");
        let b = c.add_relational("B");
        let not = c.add_not(a).unwrap();

        // repeated terms collapse to a single entry
        let and = c.add_and([b, b]).unwrap();
        assert_eq!(c.consumer_scope(and).unwrap(), vec![b]);
        assert_eq!(c.consumer_scope(not).unwrap(), vec![a]);
    }

    #[test]
    fn test_scope_of_relational_is_free_leaves_only() {
        let (c, [r1, .., free]) = sample();
        assert_eq!(c.consumer_scope(r1).unwrap(), vec![free]);
    }

    #[test]
    fn test_scope_of_unknown_subject_fails() {
        let (c, _) = sample();
        assert!(c.consumer_scope(NodeId::new(42)).is_err());
    }
}
