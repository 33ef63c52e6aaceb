//! reqcheck Core
//!
//! Core types and error handling shared across reqcheck components.
//!
//! This crate provides:
//! - Identifiers for subjects, expression nodes, and relational leaves
//! - The per-subject compliance state and the raw change-feed value
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, MalformedExpression, Result};
pub use types::{ComplianceState, LeafId, NodeId, RawCompliance, SubjectId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, MalformedExpression, Result};
    pub use crate::types::{ComplianceState, LeafId, NodeId, RawCompliance, SubjectId};
}
