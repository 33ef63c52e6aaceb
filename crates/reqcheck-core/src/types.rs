//! Core types for reqcheck

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a consumer whose compliance state is tracked (e.g. a row)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a subject id from an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle to a node inside an expression collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque identifier of a relational leaf, owned by the external data layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeafId(String);

impl LeafId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeafId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LeafId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Compliance state attached to a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceState {
    /// No information yet, or invalidated
    #[default]
    Unknown,

    /// A recomputation is in flight
    Calculating,

    /// The evaluator reported a fault; treated like `Calculating`
    Indeterminate,

    /// Settled: requirement satisfied
    Compliant,

    /// Settled: requirement violated
    NonCompliant,

    /// Settled: children disagree
    Inconclusive,
}

impl ComplianceState {
    /// Settled state for a boolean verdict
    pub fn from_verdict(compliant: bool) -> Self {
        if compliant {
            Self::Compliant
        } else {
            Self::NonCompliant
        }
    }

    /// Calculating or indeterminate
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Calculating | Self::Indeterminate)
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Compliant | Self::NonCompliant | Self::Inconclusive)
    }

    /// Roll several child states up into one.
    ///
    /// Any pending child keeps the roll-up pending, any unknown child keeps it
    /// unknown. Otherwise all-compliant and all-non-compliant map through and
    /// anything mixed is inconclusive. An empty input is unknown.
    pub fn aggregate<I>(states: I) -> Self
    where
        I: IntoIterator<Item = ComplianceState>,
    {
        let mut seen_any = false;
        let mut all_compliant = true;
        let mut all_non_compliant = true;
        let mut unknown = false;

        for state in states {
            seen_any = true;
            match state {
                Self::Calculating | Self::Indeterminate => return Self::Calculating,
                Self::Unknown => unknown = true,
                Self::Compliant => all_non_compliant = false,
                Self::NonCompliant => all_compliant = false,
                Self::Inconclusive => {
                    all_compliant = false;
                    all_non_compliant = false;
                }
            }
        }

        if !seen_any || unknown {
            Self::Unknown
        } else if all_compliant {
            Self::Compliant
        } else if all_non_compliant {
            Self::NonCompliant
        } else {
            Self::Inconclusive
        }
    }
}

impl fmt::Display for ComplianceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Calculating => "calculating",
            Self::Indeterminate => "indeterminate",
            Self::Compliant => "compliant",
            Self::NonCompliant => "non-compliant",
            Self::Inconclusive => "inconclusive",
        };
        f.write_str(label)
    }
}

/// Value carried by the raw change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawCompliance {
    /// A recomputation started
    Calculating,

    /// A recomputation finished with a verdict
    Settled(bool),

    /// The leaf evaluator failed
    Fault(String),
}

impl RawCompliance {
    /// Map a three-valued evaluation onto the feed; unknown stays calculating
    pub fn from_evaluation(result: Option<bool>) -> Self {
        match result {
            Some(verdict) => Self::Settled(verdict),
            None => Self::Calculating,
        }
    }

    /// The state this value maps to once applied
    pub fn target_state(&self) -> ComplianceState {
        match self {
            Self::Calculating => ComplianceState::Calculating,
            Self::Settled(verdict) => ComplianceState::from_verdict(*verdict),
            Self::Fault(_) => ComplianceState::Indeterminate,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }
}
