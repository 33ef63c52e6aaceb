//! reqcheck Expression Model
//!
//! Nested boolean compliance expressions over relational terms.
//!
//! Provides:
//! - The expression node model (NOT/AND/OR/XOR over relational leaves)
//! - An acyclic, insertion-ordered expression collection
//! - Context-sensitive rendering to display strings
//! - Top-level (free) expression and consumer scope resolution
//! - Three-valued evaluation against externally supplied leaf verdicts
//! - YAML expression documents

pub mod collection;
pub mod document;
pub mod evaluate;
pub mod node;
pub mod render;
pub mod resolve;

pub use collection::{ExpressionCollection, MAX_DEPTH};
pub use document::{EntryBody, ExpressionDocument, ExpressionEntry, NamedCollection};
pub use evaluate::{evaluate, LeafResultTable, LeafResults};
pub use node::{ExpressionNode, Operator, RelationalAtom};
pub use render::ExpressionRenderer;
pub use resolve::{resolve_consumer_scope, resolve_top_level};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collection::ExpressionCollection;
    pub use crate::document::{ExpressionDocument, NamedCollection};
    pub use crate::evaluate::{LeafResultTable, LeafResults};
    pub use crate::node::{ExpressionNode, Operator, RelationalAtom};
    pub use crate::render::ExpressionRenderer;
    pub use crate::resolve::{resolve_consumer_scope, resolve_top_level};
}
