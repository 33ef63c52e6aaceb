//! Insertion-ordered arena of expression nodes

use reqcheck_core::{MalformedExpression, NodeId, Result};

use crate::node::{ExpressionNode, Operator, RelationalAtom};

/// Deepest nesting that rendering and evaluation will descend into
pub const MAX_DEPTH: usize = 256;

/// An insertion-ordered set of expression nodes.
///
/// The collection owns every node; composite nodes refer to their terms by
/// [`NodeId`]. A collection holds free (top-level) and nested nodes side by
/// side, and is always acyclic: every mutating operation rejects links that
/// would make a node its own transitive child.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCollection {
    nodes: Vec<ExpressionNode>,
}

impl ExpressionCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Build a collection from pre-linked nodes, where `NodeId::new(i)` refers
    /// to `nodes[i]`. Forward references are allowed; the whole set is
    /// validated before it is accepted.
    pub fn from_nodes(nodes: Vec<ExpressionNode>) -> Result<Self> {
        let collection = Self { nodes };
        collection.validate()?;
        Ok(collection)
    }

    /// Add a relational leaf
    pub fn add_relational(&mut self, atom: impl Into<RelationalAtom>) -> NodeId {
        self.push(ExpressionNode::Relational(atom.into()))
    }

    /// Add a negation of an existing node
    pub fn add_not(&mut self, term: NodeId) -> Result<NodeId> {
        self.add_composite(Operator::Not, [term])
    }

    pub fn add_and(&mut self, terms: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        self.add_composite(Operator::And, terms)
    }

    pub fn add_or(&mut self, terms: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        self.add_composite(Operator::Or, terms)
    }

    pub fn add_xor(&mut self, terms: impl IntoIterator<Item = NodeId>) -> Result<NodeId> {
        self.add_composite(Operator::Xor, terms)
    }

    /// Add a non-relational node over existing nodes.
    ///
    /// Terms must already be part of the collection, so a freshly added node
    /// can never close a cycle.
    pub fn add_composite(
        &mut self,
        operator: Operator,
        terms: impl IntoIterator<Item = NodeId>,
    ) -> Result<NodeId> {
        let terms: Vec<NodeId> = terms.into_iter().collect();
        let id = NodeId::new(self.nodes.len());
        let node = self.checked_node(id, operator, terms)?;
        Ok(self.push(node))
    }

    /// Re-link the terms of an existing non-relational node.
    ///
    /// Fails without modifying the collection when the node is relational,
    /// when the term list is invalid for the operator, or when the new links
    /// would make `id` reachable from itself.
    pub fn replace_terms(
        &mut self,
        id: NodeId,
        terms: impl IntoIterator<Item = NodeId>,
    ) -> Result<()> {
        let operator = self
            .node(id)?
            .operator()
            .ok_or(MalformedExpression::NotComposite { node: id.index() })?;
        let terms: Vec<NodeId> = terms.into_iter().collect();
        let node = self.checked_node(id, operator, terms)?;

        for &term in node.terms() {
            if term == id || self.reaches(term, id) {
                return Err(MalformedExpression::Cycle { node: id.index() }.into());
            }
        }

        self.nodes[id.index()] = node;
        Ok(())
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&ExpressionNode> {
        self.nodes.get(id.index())
    }

    /// Look up a node, failing for ids outside this collection
    pub fn node(&self, id: NodeId) -> Result<&ExpressionNode> {
        self.get(id)
            .ok_or_else(|| MalformedExpression::UnknownNode { node: id.index() }.into())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Iterate nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ExpressionNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    /// Ids of all nodes in insertion order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: ExpressionNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn checked_node(
        &self,
        id: NodeId,
        operator: Operator,
        terms: Vec<NodeId>,
    ) -> Result<ExpressionNode> {
        if let Some(missing) = terms.iter().find(|t| !self.contains(**t)) {
            return Err(MalformedExpression::UnknownNode {
                node: missing.index(),
            }
            .into());
        }

        let node = match operator {
            Operator::Not => match terms.as_slice() {
                [term] => ExpressionNode::Not { term: *term },
                _ => {
                    return Err(MalformedExpression::ArityMismatch {
                        node: id.index(),
                        count: terms.len(),
                    }
                    .into())
                }
            },
            _ if terms.is_empty() => {
                return Err(MalformedExpression::EmptyTerms {
                    node: id.index(),
                    operator: operator.token(),
                }
                .into())
            }
            Operator::And => ExpressionNode::And { terms },
            Operator::Or => ExpressionNode::Or { terms },
            Operator::Xor => ExpressionNode::Xor { terms },
        };

        Ok(node)
    }

    /// Whether `target` is reachable from `from` through term links
    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            let Some(seen) = visited.get_mut(current.index()) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            if let Some(node) = self.get(current) {
                stack.extend(node.terms().iter().copied());
            }
        }

        false
    }

    /// Check every structural invariant of the whole collection
    fn validate(&self) -> Result<()> {
        for (id, node) in self.iter() {
            for &term in node.terms() {
                if !self.contains(term) {
                    return Err(MalformedExpression::UnknownNode { node: term.index() }.into());
                }
            }
            if let Some(operator) = node.operator() {
                if operator != Operator::Not && node.terms().is_empty() {
                    return Err(MalformedExpression::EmptyTerms {
                        node: id.index(),
                        operator: operator.token(),
                    }
                    .into());
                }
            }
        }

        // Depth-first colouring; meeting a grey node closes a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            White,
            Grey,
            Black,
        }

        let mut marks = vec![Mark::White; self.nodes.len()];
        for root in self.ids() {
            if marks[root.index()] != Mark::White {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            marks[root.index()] = Mark::Grey;

            while let Some((current, next)) = stack.pop() {
                let terms = self.nodes[current.index()].terms();
                if let Some(&term) = terms.get(next) {
                    stack.push((current, next + 1));
                    match marks[term.index()] {
                        Mark::Grey => {
                            return Err(MalformedExpression::Cycle { node: term.index() }.into())
                        }
                        Mark::White => {
                            marks[term.index()] = Mark::Grey;
                            stack.push((term, 0));
                        }
                        Mark::Black => {}
                    }
                } else {
                    marks[current.index()] = Mark::Black;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_composite_over_existing_nodes() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let and = collection.add_and([r1, r2]).unwrap();

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.node(and).unwrap().terms(), &[r1, r2]);
    }

    #[test]
    fn test_empty_composite_is_rejected() {
        let mut collection = ExpressionCollection::new();
        let err = collection.add_or(Vec::new()).unwrap_err();

        assert!(matches!(
            err.as_malformed(),
            Some(MalformedExpression::EmptyTerms { operator, .. }) if *operator == "OR"
        ));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_dangling_term_is_rejected() {
        let mut collection = ExpressionCollection::new();
        let err = collection.add_not(NodeId::new(7)).unwrap_err();

        assert_eq!(
            err.as_malformed(),
            Some(&MalformedExpression::UnknownNode { node: 7 })
        );
    }

    #[test]
    fn test_replace_terms_rejects_cycle() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let inner = collection.add_and([r1]).unwrap();
        let outer = collection.add_or([inner]).unwrap();

        let err = collection.replace_terms(inner, [r1, outer]).unwrap_err();
        assert_eq!(
            err.as_malformed(),
            Some(&MalformedExpression::Cycle {
                node: inner.index()
            })
        );
        // unchanged
        assert_eq!(collection.node(inner).unwrap().terms(), &[r1]);
    }

    #[test]
    fn test_replace_terms_rejects_self_reference() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let not = collection.add_not(r1).unwrap();

        assert!(collection.replace_terms(not, [not]).is_err());
    }

    #[test]
    fn test_replace_terms_on_relational_fails() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");

        let err = collection.replace_terms(r1, [r2]).unwrap_err();
        assert_eq!(
            err.as_malformed(),
            Some(&MalformedExpression::NotComposite { node: r1.index() })
        );
    }

    #[test]
    fn test_from_nodes_detects_cycle() {
        let nodes = vec![
            ExpressionNode::And {
                terms: vec![NodeId::new(1)],
            },
            ExpressionNode::Not {
                term: NodeId::new(0),
            },
        ];

        let err = ExpressionCollection::from_nodes(nodes).unwrap_err();
        assert!(matches!(
            err.as_malformed(),
            Some(MalformedExpression::Cycle { .. })
        ));
    }

    #[test]
    fn test_from_nodes_accepts_forward_references_and_shared_terms() {
        let nodes = vec![
            ExpressionNode::Or {
                terms: vec![NodeId::new(1), NodeId::new(2)],
            },
            ExpressionNode::Relational(RelationalAtom::from("R1")),
            ExpressionNode::And {
                terms: vec![NodeId::new(1), NodeId::new(3)],
            },
            ExpressionNode::Relational(RelationalAtom::from("R2")),
        ];

        let collection = ExpressionCollection::from_nodes(nodes).unwrap();
        assert_eq!(collection.len(), 4);
    }
}
