//! Human-readable rendering of expression trees
//!
//! Rendering is context-sensitive: a non-relational node is wrapped in
//! parentheses only when it sits below another non-relational node in the
//! current traversal. The same subtree therefore renders differently as a
//! traversal root than as an inner node. Relational leaves always carry their
//! own parentheses.

use reqcheck_core::{MalformedExpression, NodeId, Result};

use crate::collection::{ExpressionCollection, MAX_DEPTH};
use crate::node::{ExpressionNode, Operator};

/// Renders nodes of a single collection.
///
/// Pure: it only reads the collection, so it may run concurrently with state
/// updates.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionRenderer<'a> {
    collection: &'a ExpressionCollection,
}

impl<'a> ExpressionRenderer<'a> {
    pub fn new(collection: &'a ExpressionCollection) -> Self {
        Self { collection }
    }

    /// Render `id` as a free, top-level expression
    pub fn render(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        self.write_node(id, false, 0, &mut out)?;
        Ok(out)
    }

    /// Render `id` as if it were a term of another composite
    pub fn render_nested(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        self.write_node(id, true, 0, &mut out)?;
        Ok(out)
    }

    /// Render several free expressions joined by `joiner`
    pub fn render_sequence(
        &self,
        ids: impl IntoIterator<Item = NodeId>,
        joiner: Operator,
    ) -> Result<String> {
        let mut out = String::new();
        for (index, id) in ids.into_iter().enumerate() {
            if index > 0 {
                push_token(&mut out, joiner);
            }
            self.write_node(id, false, 0, &mut out)?;
        }
        Ok(out)
    }

    /// Render every free expression of the collection, conjoined
    pub fn render_top_level(&self) -> Result<String> {
        self.render_sequence(crate::resolve::resolve_top_level(self.collection), Operator::And)
    }

    fn write_node(&self, id: NodeId, nested: bool, depth: usize, out: &mut String) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(MalformedExpression::TooDeep {
                node: id.index(),
                limit: MAX_DEPTH,
            }
            .into());
        }

        let (operator, terms) = match self.collection.node(id)? {
            ExpressionNode::Relational(atom) => {
                out.push('(');
                out.push_str(&atom.text);
                out.push(')');
                return Ok(());
            }
            ExpressionNode::Not { term } => (Operator::Not, std::slice::from_ref(term)),
            ExpressionNode::And { terms } => (Operator::And, terms.as_slice()),
            ExpressionNode::Or { terms } => (Operator::Or, terms.as_slice()),
            ExpressionNode::Xor { terms } => (Operator::Xor, terms.as_slice()),
        };

        if terms.is_empty() {
            return Err(MalformedExpression::EmptyTerms {
                node: id.index(),
                operator: operator.token(),
            }
            .into());
        }

        if nested {
            out.push('(');
        }
        if operator == Operator::Not {
            push_token(out, operator);
            self.write_node(terms[0], true, depth + 1, out)?;
        } else {
            for (index, term) in terms.iter().enumerate() {
                if index > 0 {
                    push_token(out, operator);
                }
                self.write_node(*term, true, depth + 1, out)?;
            }
        }
        if nested {
            out.push(')');
        }

        Ok(())
    }
}

fn push_token(out: &mut String, operator: Operator) {
    out.push(' ');
    out.push_str(operator.token());
    out.push(' ');
}

impl ExpressionCollection {
    /// Renderer over this collection
    pub fn renderer(&self) -> ExpressionRenderer<'_> {
        ExpressionRenderer::new(self)
    }

    /// Render `id` as a free, top-level expression
    pub fn render(&self, id: NodeId) -> Result<String> {
        self.renderer().render(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RelationalAtom;

    fn not_chain(length: usize) -> (ExpressionCollection, NodeId) {
        let mut collection = ExpressionCollection::new();
        let mut top = collection.add_relational(RelationalAtom::new("r", "x > 0"));
        for _ in 0..length {
            top = collection.add_not(top).unwrap();
        }
        (collection, top)
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let (collection, top) = not_chain(MAX_DEPTH + 1);
        let err = collection.render(top).unwrap_err();
        assert!(matches!(
            err.as_malformed(),
            Some(MalformedExpression::TooDeep { limit: MAX_DEPTH, .. })
        ));

        let (collection, top) = not_chain(MAX_DEPTH);
        assert!(collection.render(top).unwrap().ends_with("(x > 0)"));
    }

    #[test]
    fn test_relational_renders_with_parentheses() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational(RelationalAtom::new("r1", "mass <= 10 kg"));

        assert_eq!(collection.render(r1).unwrap(), "(mass <= 10 kg)");
        assert_eq!(collection.renderer().render_nested(r1).unwrap(), "(mass <= 10 kg)");
    }

    #[test]
    fn test_operator_token_comes_from_parent() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let r3 = collection.add_relational("R3");
        let or = collection.add_or([r2, r3]).unwrap();
        let xor = collection.add_xor([r1, or]).unwrap();

        assert_eq!(collection.render(xor).unwrap(), "(R1) XOR ((R2) OR (R3))");
    }

    #[test]
    fn test_free_not_has_leading_token_and_no_wrapper() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let not = collection.add_not(r1).unwrap();

        assert_eq!(collection.render(not).unwrap(), " NOT (R1)");
    }

    #[test]
    fn test_not_child_composite_is_parenthesized_by_nesting() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let and = collection.add_and([r1, r2]).unwrap();
        let not = collection.add_not(and).unwrap();

        assert_eq!(collection.render(not).unwrap(), " NOT ((R1) AND (R2))");
    }

    #[test]
    fn test_nested_not_is_wrapped() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let not = collection.add_not(r1).unwrap();
        let and = collection.add_and([not, r2]).unwrap();

        assert_eq!(collection.render(and).unwrap(), "( NOT (R1)) AND (R2)");
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let xor = collection.add_xor([r1, r2]).unwrap();
        let not = collection.add_not(xor).unwrap();

        let first = collection.render(not).unwrap();
        let second = collection.render(not).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_sequence_and_top_level() {
        let mut collection = ExpressionCollection::new();
        let r1 = collection.add_relational("R1");
        let r2 = collection.add_relational("R2");
        let r3 = collection.add_relational("R3");
        let or = collection.add_or([r1, r2]).unwrap();

        let renderer = collection.renderer();
        assert_eq!(renderer.render_top_level().unwrap(), "(R3) AND (R1) OR (R2)");
        assert_eq!(
            renderer.render_sequence([or, r3], Operator::Or).unwrap(),
            "(R1) OR (R2) OR (R3)"
        );
    }

    #[test]
    fn test_unknown_node_fails() {
        let collection = ExpressionCollection::new();
        let err = collection.render(NodeId::new(0)).unwrap_err();

        assert_eq!(
            err.as_malformed(),
            Some(&MalformedExpression::UnknownNode { node: 0 })
        );
    }
}
