//! Error types for reqcheck

/// Result type alias using reqcheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reqcheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An expression tree violates a structural invariant
    #[error("malformed expression: {0}")]
    Malformed(#[from] MalformedExpression),

    /// Expression document errors
    #[error("document error: {0}")]
    Document(String),

    /// Consumer containment errors
    #[error("containment error: {0}")]
    Containment(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new document error
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Create a new containment error
    pub fn containment(msg: impl Into<String>) -> Self {
        Self::Containment(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the structural violation, if this is one
    pub fn as_malformed(&self) -> Option<&MalformedExpression> {
        match self {
            Self::Malformed(m) => Some(m),
            _ => None,
        }
    }
}

/// Structural violations of an expression tree.
///
/// Raised when a tree is built or re-linked, and by the renderer if it ever
/// meets a composite without terms. Never produced for evaluation outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedExpression {
    /// Linking would make a node its own transitive child
    #[error("node {node} would become its own transitive child")]
    Cycle { node: usize },

    /// AND/OR/XOR without terms
    #[error("{operator} expression {node} has no terms")]
    EmptyTerms { node: usize, operator: &'static str },

    /// NOT with a term count other than one
    #[error("NOT expression {node} needs exactly one term, got {count}")]
    ArityMismatch { node: usize, count: usize },

    /// Terms were supplied for a relational leaf
    #[error("node {node} is relational and cannot take terms")]
    NotComposite { node: usize },

    /// A node id that is not part of the collection
    #[error("node {node} is not part of this collection")]
    UnknownNode { node: usize },

    /// Two document entries share a name
    #[error("expression name '{name}' is declared more than once")]
    DuplicateName { name: String },

    /// A document entry references an undeclared name
    #[error("expression '{from}' references unknown expression '{to}'")]
    UnknownReference { from: String, to: String },

    /// Nesting below a node exceeds what a traversal will follow
    #[error("expression {node} nests deeper than {limit} levels")]
    TooDeep { node: usize, limit: usize },
}
