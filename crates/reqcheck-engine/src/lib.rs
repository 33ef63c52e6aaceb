//! reqcheck Engine
//!
//! Event-driven compliance state for requirement consumers.
//!
//! An external evaluator publishes [`RawComplianceEvent`]s per subject. The
//! [`ComplianceAggregator`] debounces the way out of pending states, keeps one
//! [`ComplianceState`](reqcheck_core::ComplianceState) per subject, republishes
//! every change as a [`StateChange`], and resets the stateful ancestors of a
//! subject whenever a settled verdict lands.

pub mod aggregator;
pub mod config;
pub mod consumer;
pub mod event_bus;
pub mod metrics;
pub mod session;
pub mod state;

pub use crate::aggregator::ComplianceAggregator;
pub use crate::config::EngineConfig;
pub use crate::consumer::{ConsumerKind, ConsumerTree};
pub use crate::event_bus::{ComplianceEventBus, RawComplianceEvent, StateChange, SubjectEvent};
pub use crate::metrics::{describe_metrics, EngineMetrics, MetricsSnapshot};
pub use crate::session::ComplianceSession;
pub use crate::state::{StateCell, Transition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregator::ComplianceAggregator;
    pub use crate::config::EngineConfig;
    pub use crate::event_bus::{ComplianceEventBus, RawComplianceEvent, StateChange};
    pub use crate::session::ComplianceSession;
    pub use reqcheck_core::{ComplianceState, RawCompliance, SubjectId};
}
