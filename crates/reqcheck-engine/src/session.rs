//! Session wiring the raw queue, the aggregator and the state bus

use reqcheck_core::{ComplianceState, RawCompliance, SubjectId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::aggregator::ComplianceAggregator;
use crate::config::EngineConfig;
use crate::event_bus::{ComplianceEventBus, RawComplianceEvent, StateChange};

/// Owns the raw event queue, the state bus and the aggregator wired between
/// them.
///
/// Raw events travel over an unbounded queue, so a burst of any size reaches
/// the aggregator intact and in order. Nothing here is global: create one
/// session per independent set of subjects. Dropping the session stops its
/// dispatch task.
pub struct ComplianceSession {
    config: EngineConfig,
    raw: mpsc::UnboundedSender<RawComplianceEvent>,
    states: Arc<ComplianceEventBus<StateChange>>,
    aggregator: ComplianceAggregator,
    dispatcher: JoinHandle<()>,
}

impl ComplianceSession {
    /// Create the queue and the state bus and start the aggregator. Needs a
    /// tokio runtime.
    pub fn start(config: EngineConfig) -> Self {
        let (raw, queue) = mpsc::unbounded_channel();
        let states = Arc::new(ComplianceEventBus::new(config.bus_capacity));
        let aggregator = ComplianceAggregator::new(&config, Arc::clone(&states));
        let dispatcher = aggregator.spawn_queue(queue);

        tracing::info!(
            settle_delay_ms = config.settle_delay_ms,
            bus_capacity = config.bus_capacity,
            "Compliance session started"
        );

        Self {
            config,
            raw,
            states,
            aggregator,
            dispatcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A sender for producers that publish raw events from elsewhere
    pub fn raw_sender(&self) -> mpsc::UnboundedSender<RawComplianceEvent> {
        self.raw.clone()
    }

    /// State changes published by the aggregator
    pub fn states(&self) -> &Arc<ComplianceEventBus<StateChange>> {
        &self.states
    }

    pub fn aggregator(&self) -> &ComplianceAggregator {
        &self.aggregator
    }

    /// Queue a raw value for the aggregator
    pub fn publish_raw(&self, subject: impl Into<SubjectId>, value: RawCompliance) {
        let event = RawComplianceEvent::new(subject, value);
        if self.raw.send(event).is_err() {
            tracing::warn!("Compliance session dispatcher stopped, raw event dropped");
        }
    }

    pub fn state(&self, subject: &SubjectId) -> ComplianceState {
        self.aggregator.state(subject)
    }
}

impl Drop for ComplianceSession {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
