//! Subject-keyed publish/subscribe bus for raw and derived compliance events

use futures::stream::{self, Stream};
use parking_lot::RwLock;
use reqcheck_core::{ComplianceState, RawCompliance, SubjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// An event that belongs to one subject
pub trait SubjectEvent: Clone + Send + 'static {
    fn subject(&self) -> &SubjectId;
}

/// Raw compliance change reported by the external evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComplianceEvent {
    pub subject: SubjectId,
    pub value: RawCompliance,
}

impl RawComplianceEvent {
    pub fn new(subject: impl Into<SubjectId>, value: RawCompliance) -> Self {
        Self {
            subject: subject.into(),
            value,
        }
    }
}

impl SubjectEvent for RawComplianceEvent {
    fn subject(&self) -> &SubjectId {
        &self.subject
    }
}

/// A subject's compliance state changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub subject: SubjectId,
    pub previous: ComplianceState,
    pub current: ComplianceState,
}

impl SubjectEvent for StateChange {
    fn subject(&self) -> &SubjectId {
        &self.subject
    }
}

/// Typed publish/subscribe channel keyed by subject identity.
///
/// Every event goes to the all-subjects channel and, when somebody listens
/// for it, to its subject's own channel. Events of one subject are delivered
/// in publication order on both.
pub struct ComplianceEventBus<E> {
    capacity: usize,
    all: broadcast::Sender<E>,
    subjects: RwLock<HashMap<SubjectId, broadcast::Sender<E>>>,
}

impl<E: SubjectEvent> ComplianceEventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (all, _) = broadcast::channel(capacity);
        Self {
            capacity,
            all,
            subjects: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to events of every subject
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.all.subscribe()
    }

    /// Subscribe to events of one subject
    pub fn subscribe_subject(&self, subject: &SubjectId) -> broadcast::Receiver<E> {
        if let Some(sender) = self.subjects.read().get(subject) {
            return sender.subscribe();
        }

        self.subjects
            .write()
            .entry(subject.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Events of one subject as a stream; lagged events are skipped
    pub fn stream_subject(&self, subject: &SubjectId) -> impl Stream<Item = E> + Send + Unpin {
        Box::pin(stream::unfold(self.subscribe_subject(subject), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Subject stream lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }))
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: E) {
        let stale = {
            let subjects = self.subjects.read();
            match subjects.get(event.subject()) {
                // Ignore send errors (no subscribers)
                Some(sender) => sender.send(event.clone()).is_err(),
                None => false,
            }
        };

        if stale {
            let mut subjects = self.subjects.write();
            if subjects
                .get(event.subject())
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                subjects.remove(event.subject());
            }
        }

        let _ = self.all.send(event);
    }

    /// Get the number of active subscribers across both channel kinds
    pub fn subscriber_count(&self) -> usize {
        let per_subject: usize = self
            .subjects
            .read()
            .values()
            .map(|sender| sender.receiver_count())
            .sum();
        self.all.receiver_count() + per_subject
    }
}

impl<E: SubjectEvent> Default for ComplianceEventBus<E> {
    fn default() -> Self {
        Self::new(1024)
    }
}
