//! Compliance expression node definitions

use reqcheck_core::{LeafId, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean operator of a non-relational node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Not,
    And,
    Or,
    Xor,
}

impl Operator {
    /// Literal token used when rendering
    pub fn token(self) -> &'static str {
        match self {
            Self::Not => "NOT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The parameter/value comparison a relational leaf stands for.
///
/// The comparison itself lives in the external data layer; the engine only
/// needs something to show and a key to look its result up by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalAtom {
    /// Key under which the leaf evaluator reports results
    pub leaf: LeafId,

    /// Display text, e.g. `mass <= 10 kg`
    pub text: String,
}

impl RelationalAtom {
    pub fn new(leaf: impl Into<LeafId>, text: impl Into<String>) -> Self {
        Self {
            leaf: leaf.into(),
            text: text.into(),
        }
    }
}

impl From<&str> for RelationalAtom {
    /// Uses the text as the leaf id as well
    fn from(text: &str) -> Self {
        Self::new(text, text)
    }
}

/// A node of a compliance expression tree.
///
/// Children are handles into the owning
/// [`ExpressionCollection`](crate::ExpressionCollection); a node never owns
/// its terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionNode {
    /// Leaf comparison
    Relational(RelationalAtom),

    /// Negation of exactly one term
    Not { term: NodeId },

    /// Conjunction
    And { terms: Vec<NodeId> },

    /// Disjunction
    Or { terms: Vec<NodeId> },

    /// Exclusive disjunction (odd parity)
    Xor { terms: Vec<NodeId> },
}

impl ExpressionNode {
    /// Operator of this node, `None` for relational leaves
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Self::Relational(_) => None,
            Self::Not { .. } => Some(Operator::Not),
            Self::And { .. } => Some(Operator::And),
            Self::Or { .. } => Some(Operator::Or),
            Self::Xor { .. } => Some(Operator::Xor),
        }
    }

    /// Direct children, in order
    pub fn terms(&self) -> &[NodeId] {
        match self {
            Self::Relational(_) => &[],
            Self::Not { term } => std::slice::from_ref(term),
            Self::And { terms } | Self::Or { terms } | Self::Xor { terms } => terms,
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, Self::Relational(_))
    }

    pub fn atom(&self) -> Option<&RelationalAtom> {
        match self {
            Self::Relational(atom) => Some(atom),
            _ => None,
        }
    }

    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self.operator() {
            None => "RELATIONAL",
            Some(op) => op.token(),
        }
    }
}
