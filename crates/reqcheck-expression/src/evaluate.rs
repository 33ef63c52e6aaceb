//! Three-valued evaluation of expression trees against leaf results
//!
//! Relational comparisons are computed by an external collaborator; this
//! module only combines the per-leaf verdicts it reports. A leaf without a
//! reported result is unknown, and unknowns propagate with Kleene semantics:
//! `AND` is false as soon as any term is false, `OR` true as soon as any term
//! is true. `XOR` is odd parity over all terms and unknown if any term is.

use reqcheck_core::{LeafId, MalformedExpression, NodeId, Result, SubjectId};
use std::collections::HashMap;

use crate::collection::{ExpressionCollection, MAX_DEPTH};
use crate::node::ExpressionNode;

/// Source of relational leaf verdicts, keyed by `(subject, leaf)`
pub trait LeafResults {
    /// The verdict for `leaf` evaluated against `subject`, if known
    fn result(&self, subject: &SubjectId, leaf: &LeafId) -> Option<bool>;
}

/// In-memory table of leaf verdicts
#[derive(Debug, Clone, Default)]
pub struct LeafResultTable {
    results: HashMap<(SubjectId, LeafId), bool>,
}

impl LeafResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict, replacing any previous one
    pub fn insert(&mut self, subject: impl Into<SubjectId>, leaf: impl Into<LeafId>, verdict: bool) {
        self.results.insert((subject.into(), leaf.into()), verdict);
    }

    /// Forget a verdict, e.g. while its source data is being refreshed
    pub fn remove(&mut self, subject: &SubjectId, leaf: &LeafId) -> Option<bool> {
        self.results.remove(&(subject.clone(), leaf.clone()))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl LeafResults for LeafResultTable {
    fn result(&self, subject: &SubjectId, leaf: &LeafId) -> Option<bool> {
        self.results.get(&(subject.clone(), leaf.clone())).copied()
    }
}

/// Subject-independent verdicts, one per leaf
impl LeafResults for HashMap<LeafId, bool> {
    fn result(&self, _subject: &SubjectId, leaf: &LeafId) -> Option<bool> {
        self.get(leaf).copied()
    }
}

/// Evaluate `id` for `subject`.
///
/// Returns `Ok(None)` when the outcome depends on leaves without a verdict.
/// Errors for ids outside the collection and for nesting deeper than
/// [`MAX_DEPTH`].
pub fn evaluate(
    collection: &ExpressionCollection,
    id: NodeId,
    subject: &SubjectId,
    results: &dyn LeafResults,
) -> Result<Option<bool>> {
    evaluate_at(collection, id, subject, results, 0)
}

fn evaluate_at(
    collection: &ExpressionCollection,
    id: NodeId,
    subject: &SubjectId,
    results: &dyn LeafResults,
    depth: usize,
) -> Result<Option<bool>> {
    if depth > MAX_DEPTH {
        return Err(MalformedExpression::TooDeep {
            node: id.index(),
            limit: MAX_DEPTH,
        }
        .into());
    }

    let value = match collection.node(id)? {
        ExpressionNode::Relational(atom) => results.result(subject, &atom.leaf),
        ExpressionNode::Not { term } => {
            evaluate_at(collection, *term, subject, results, depth + 1)?.map(|v| !v)
        }
        ExpressionNode::And { terms } => {
            let mut unknown = false;
            for term in terms {
                match evaluate_at(collection, *term, subject, results, depth + 1)? {
                    Some(false) => return Ok(Some(false)),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            (!unknown).then_some(true)
        }
        ExpressionNode::Or { terms } => {
            let mut unknown = false;
            for term in terms {
                match evaluate_at(collection, *term, subject, results, depth + 1)? {
                    Some(true) => return Ok(Some(true)),
                    Some(false) => {}
                    None => unknown = true,
                }
            }
            (!unknown).then_some(false)
        }
        ExpressionNode::Xor { terms } => {
            let mut parity = false;
            let mut unknown = false;
            for term in terms {
                match evaluate_at(collection, *term, subject, results, depth + 1)? {
                    Some(v) => parity ^= v,
                    None => unknown = true,
                }
            }
            (!unknown).then_some(parity)
        }
    };

    Ok(value)
}

impl ExpressionCollection {
    /// See [`evaluate`]
    pub fn evaluate(
        &self,
        id: NodeId,
        subject: &SubjectId,
        results: &dyn LeafResults,
    ) -> Result<Option<bool>> {
        evaluate(self, id, subject, results)
    }
}
