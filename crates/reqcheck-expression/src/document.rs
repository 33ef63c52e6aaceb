//! Named expression documents

use reqcheck_core::{Error, MalformedExpression, NodeId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::collection::ExpressionCollection;
use crate::node::{ExpressionNode, RelationalAtom};

/// A set of named compliance expressions, usually loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionDocument {
    /// Document name
    pub name: String,

    /// What the expressions constrain
    #[serde(default)]
    pub description: String,

    /// Expressions in declaration order; references may point forward
    pub expressions: Vec<ExpressionEntry>,
}

/// A single named expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EntryFields")]
pub struct ExpressionEntry {
    /// Unique name, referenced by other entries
    pub name: String,

    /// Leaf id reported by the evaluator; defaults to the entry name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<String>,

    /// The expression itself
    #[serde(flatten)]
    pub body: EntryBody,
}

/// Body of an entry: one relational text or one operator over names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryBody {
    Relational(String),
    Not(String),
    And(Vec<String>),
    Or(Vec<String>),
    Xor(Vec<String>),
}

/// Flat form of an entry as written; exactly one body key may be set
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryFields {
    name: String,
    #[serde(default)]
    leaf: Option<String>,
    #[serde(default)]
    relational: Option<String>,
    #[serde(default)]
    not: Option<String>,
    #[serde(default)]
    and: Option<Vec<String>>,
    #[serde(default)]
    or: Option<Vec<String>>,
    #[serde(default)]
    xor: Option<Vec<String>>,
}

impl TryFrom<EntryFields> for ExpressionEntry {
    type Error = Error;

    fn try_from(fields: EntryFields) -> Result<Self> {
        let EntryFields {
            name,
            leaf,
            relational,
            not,
            and,
            or,
            xor,
        } = fields;

        let mut bodies: Vec<EntryBody> = [
            relational.map(EntryBody::Relational),
            not.map(EntryBody::Not),
            and.map(EntryBody::And),
            or.map(EntryBody::Or),
            xor.map(EntryBody::Xor),
        ]
        .into_iter()
        .flatten()
        .collect();

        if bodies.len() != 1 {
            return Err(Error::document(format!(
                "expression '{}' must have exactly one of relational, not, and, or, xor (found {})",
                name,
                bodies.len()
            )));
        }
        let body = bodies.remove(0);

        Ok(Self { name, leaf, body })
    }
}

impl ExpressionDocument {
    /// Load a document from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a document from a file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::document(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Link the entries into a validated collection.
    ///
    /// Node ids follow declaration order.
    pub fn build(&self) -> Result<NamedCollection> {
        let mut lookup = HashMap::with_capacity(self.expressions.len());
        for (index, entry) in self.expressions.iter().enumerate() {
            if lookup.insert(entry.name.clone(), NodeId::new(index)).is_some() {
                return Err(MalformedExpression::DuplicateName {
                    name: entry.name.clone(),
                }
                .into());
            }
        }

        let resolve = |from: &str, to: &str| -> Result<NodeId> {
            lookup.get(to).copied().ok_or_else(|| {
                MalformedExpression::UnknownReference {
                    from: from.to_string(),
                    to: to.to_string(),
                }
                .into()
            })
        };
        let resolve_all = |from: &str, names: &[String]| -> Result<Vec<NodeId>> {
            names.iter().map(|name| resolve(from, name)).collect()
        };

        let mut nodes = Vec::with_capacity(self.expressions.len());
        for entry in &self.expressions {
            let from = entry.name.as_str();
            let node = match &entry.body {
                EntryBody::Relational(text) => ExpressionNode::Relational(RelationalAtom::new(
                    entry.leaf.as_deref().unwrap_or(from),
                    text.as_str(),
                )),
                EntryBody::Not(term) => ExpressionNode::Not {
                    term: resolve(from, term)?,
                },
                EntryBody::And(terms) => ExpressionNode::And {
                    terms: resolve_all(from, terms)?,
                },
                EntryBody::Or(terms) => ExpressionNode::Or {
                    terms: resolve_all(from, terms)?,
                },
                EntryBody::Xor(terms) => ExpressionNode::Xor {
                    terms: resolve_all(from, terms)?,
                },
            };
            nodes.push(node);
        }

        let collection = ExpressionCollection::from_nodes(nodes)?;
        tracing::debug!(
            document = %self.name,
            expressions = collection.len(),
            "Expression document linked"
        );

        Ok(NamedCollection {
            collection,
            names: self.expressions.iter().map(|e| e.name.clone()).collect(),
            lookup,
        })
    }
}

/// A collection built from a document, with name lookup both ways
#[derive(Debug, Clone)]
pub struct NamedCollection {
    collection: ExpressionCollection,
    names: Vec<String>,
    lookup: HashMap<String, NodeId>,
}

impl NamedCollection {
    pub fn collection(&self) -> &ExpressionCollection {
        &self.collection
    }

    /// Id of the entry called `name`
    pub fn id(&self, name: &str) -> Option<NodeId> {
        self.lookup.get(name).copied()
    }

    /// Name of the entry behind `id`
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Like [`id`](Self::id) but failing with a document error
    pub fn require(&self, name: &str) -> Result<NodeId> {
        self.id(name)
            .ok_or_else(|| Error::document(format!("no expression named '{}'", name)))
    }
}
