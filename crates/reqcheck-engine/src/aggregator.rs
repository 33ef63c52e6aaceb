//! Debounced per-subject compliance aggregation
//!
//! The aggregator turns the raw change feed into per-subject
//! [`ComplianceState`]s. Leaving a pending state is debounced: a settled
//! verdict only lands once the settle delay has passed without another event
//! for the same subject, and the last verdict wins. Everything else applies
//! immediately. Once a settled verdict is applied, the stateful ancestors of
//! the subject are reset to `Unknown` so their owners recompute.

use parking_lot::Mutex;
use reqcheck_core::{ComplianceState, RawCompliance, Result, SubjectId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::consumer::{ConsumerKind, ConsumerTree};
use crate::event_bus::{ComplianceEventBus, RawComplianceEvent, StateChange};
use crate::metrics::EngineMetrics;
use crate::state::Transition;

/// Per-subject compliance state with debounced settling
#[derive(Clone)]
pub struct ComplianceAggregator {
    inner: Arc<AggregatorInner>,
}

struct AggregatorInner {
    consumers: Mutex<ConsumerTree>,
    states: Arc<ComplianceEventBus<StateChange>>,
    settle_delay: Duration,
    metrics: EngineMetrics,
}

impl ComplianceAggregator {
    /// Create an aggregator publishing state changes on `states`
    pub fn new(config: &EngineConfig, states: Arc<ComplianceEventBus<StateChange>>) -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                consumers: Mutex::new(ConsumerTree::new()),
                states,
                settle_delay: config.settle_delay(),
                metrics: EngineMetrics::new(),
            }),
        }
    }

    /// Register a stateful consumer below `parent`
    pub fn attach(&self, subject: impl Into<SubjectId>, parent: Option<SubjectId>) -> Result<()> {
        self.inner
            .consumers
            .lock()
            .attach(subject.into(), parent, ConsumerKind::Stateful)
    }

    /// Register a consumer that only links the chain and holds no state
    pub fn attach_structural(
        &self,
        subject: impl Into<SubjectId>,
        parent: Option<SubjectId>,
    ) -> Result<()> {
        self.inner
            .consumers
            .lock()
            .attach(subject.into(), parent, ConsumerKind::Structural)
    }

    /// Remove a consumer, cancelling its pending settle and resetting it to
    /// `Unknown`. Returns whether the subject was registered.
    pub fn detach(&self, subject: &SubjectId) -> bool {
        let mut consumers = self.inner.consumers.lock();
        match consumers.detach(subject) {
            Some(previous) => {
                tracing::debug!(subject = %subject, "Consumer detached");
                self.inner.publish(subject, previous, ComplianceState::Unknown);
                true
            }
            None => false,
        }
    }

    /// Current state of `subject`; `Unknown` if it is not a stateful consumer
    pub fn state(&self, subject: &SubjectId) -> ComplianceState {
        self.inner
            .consumers
            .lock()
            .state(subject)
            .unwrap_or_default()
    }

    /// Whether `subject` has a settle waiting for its delay
    pub fn has_pending(&self, subject: &SubjectId) -> bool {
        self.inner
            .consumers
            .lock()
            .cell(subject)
            .is_some_and(|cell| cell.has_pending())
    }

    /// Combined verdict of the stateful consumers directly below `parent`
    pub fn rollup(&self, parent: &SubjectId) -> ComplianceState {
        let consumers = self.inner.consumers.lock();
        let children = consumers.children_of(parent);
        ComplianceState::aggregate(children.iter().filter_map(|child| consumers.state(child)))
    }

    /// Known stateful subjects and their states, sorted by subject
    pub fn states(&self) -> Vec<(SubjectId, ComplianceState)> {
        let consumers = self.inner.consumers.lock();
        let mut states: Vec<_> = consumers
            .subjects()
            .filter_map(|subject| consumers.state(subject).map(|state| (subject.clone(), state)))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn settle_delay(&self) -> Duration {
        self.inner.settle_delay
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.inner.metrics
    }

    /// Apply one raw event.
    ///
    /// Must run inside a tokio runtime: a debounced settle is driven by a
    /// spawned timer task.
    pub fn handle(&self, event: &RawComplianceEvent) {
        let inner = &self.inner;
        inner.metrics.record_event();

        let mut consumers = inner.consumers.lock();
        let Some(cell) = consumers.cell_or_register(&event.subject) else {
            tracing::debug!(subject = %event.subject, "Ignoring event for structural consumer");
            return;
        };

        match cell.decide(&event.value) {
            Transition::Apply(state) => {
                if cell.cancel_pending() {
                    inner.metrics.record_superseded();
                }
                if let RawCompliance::Fault(reason) = &event.value {
                    inner.metrics.record_fault();
                    tracing::warn!(subject = %event.subject, reason = %reason, "Compliance evaluation failed");
                }
                inner.apply(&mut consumers, &event.subject, state);
            }
            Transition::Schedule(state) => {
                if cell.has_pending() {
                    inner.metrics.record_superseded();
                }
                let generation = cell.arm(state);

                let timer_inner = Arc::clone(inner);
                let subject = event.subject.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(timer_inner.settle_delay).await;
                    timer_inner.fire(&subject, generation);
                });
                cell.attach_timer(generation, timer);

                tracing::trace!(subject = %event.subject, %state, generation, "Settle scheduled");
            }
        }
    }

    /// Start draining a raw event queue on a background task.
    ///
    /// The queue never drops events, so every subject sees its full history
    /// in publication order. The task ends once every sender is gone.
    pub fn spawn_queue(
        &self,
        mut queue: mpsc::UnboundedReceiver<RawComplianceEvent>,
    ) -> JoinHandle<()> {
        let aggregator = self.clone();

        tokio::spawn(async move {
            while let Some(event) = queue.recv().await {
                aggregator.handle(&event);
            }
            tracing::debug!("Raw compliance queue closed, aggregator stopped");
        })
    }

    /// Start consuming a shared broadcast `feed` on a background task.
    ///
    /// The subscription is taken before this returns, so nothing published
    /// afterwards is missed unless the receiver lags. Skipped events cannot be
    /// replayed, so on lag every pending subject is reset to `Unknown` for its
    /// owner to recompute. The task ends when the feed closes.
    pub fn spawn(&self, feed: &ComplianceEventBus<RawComplianceEvent>) -> JoinHandle<()> {
        let mut receiver = feed.subscribe();
        let aggregator = self.clone();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => aggregator.handle(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Aggregator lagged behind the raw compliance feed");
                        aggregator.recover_from_lag();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Raw compliance feed closed, aggregator stopped");
        })
    }

    /// Reset every pending subject to `Unknown`, cancelling its settle.
    ///
    /// Returns the subjects that were reset.
    pub fn recover_from_lag(&self) -> Vec<SubjectId> {
        let inner = &self.inner;
        let mut consumers = inner.consumers.lock();

        let reset = consumers.reset_pending();
        for (subject, previous) in &reset {
            inner.publish(subject, *previous, ComplianceState::Unknown);
        }
        reset.into_iter().map(|(subject, _)| subject).collect()
    }
}

impl AggregatorInner {
    /// Timer callback; stale generations are ignored
    fn fire(&self, subject: &SubjectId, generation: u64) {
        let mut consumers = self.consumers.lock();
        let Some(state) = consumers
            .cell_mut(subject)
            .and_then(|cell| cell.take_pending(generation))
        else {
            tracing::trace!(subject = %subject, generation, "Stale settle timer ignored");
            return;
        };

        self.apply(&mut consumers, subject, state);
    }

    /// Set the state, publish the change and, for a settled verdict,
    /// invalidate the ancestors. Runs under the consumers lock so changes are
    /// published in the order they are applied.
    fn apply(&self, consumers: &mut ConsumerTree, subject: &SubjectId, state: ComplianceState) {
        let Some(cell) = consumers.cell_mut(subject) else {
            return;
        };
        let previous = cell.set(state);
        self.publish(subject, previous, state);

        if !state.is_settled() {
            return;
        }
        self.metrics.record_settle();

        for (ancestor, previous) in consumers.invalidate_ancestors(subject) {
            self.metrics.record_invalidation();
            tracing::debug!(subject = %subject, ancestor = %ancestor, "Ancestor invalidated");
            self.publish(&ancestor, previous, ComplianceState::Unknown);
        }
    }

    fn publish(&self, subject: &SubjectId, previous: ComplianceState, current: ComplianceState) {
        if previous == current {
            return;
        }
        tracing::debug!(subject = %subject, %previous, %current, "Compliance state changed");
        self.states.publish(StateChange {
            subject: subject.clone(),
            previous,
            current,
        });
    }
}
