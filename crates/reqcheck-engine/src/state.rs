//! Per-subject compliance state machine

use reqcheck_core::{ComplianceState, RawCompliance};
use tokio::task::JoinHandle;

/// What to do with an incoming raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Apply the state right away
    Apply(ComplianceState),

    /// Apply the state once the settle delay has passed undisturbed
    Schedule(ComplianceState),
}

/// A settle waiting for its delay to elapse
#[derive(Debug)]
struct PendingSettle {
    generation: u64,
    state: ComplianceState,
    timer: Option<JoinHandle<()>>,
}

/// Compliance state of one subject, plus at most one pending settle.
///
/// Every arm or cancel bumps the generation, so a timer that already woke up
/// can tell that it has been superseded.
#[derive(Debug, Default)]
pub struct StateCell {
    state: ComplianceState,
    pending: Option<PendingSettle>,
    generation: u64,
}

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ComplianceState {
        self.state
    }

    /// Whether a settle is waiting to be applied
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Decide how `value` is applied given the current state.
    ///
    /// Only the way out of a pending state is debounced: pending signals and
    /// anything arriving in a non-pending state apply immediately.
    pub fn decide(&self, value: &RawCompliance) -> Transition {
        let target = value.target_state();
        if self.state.is_pending() && value.is_settled() {
            Transition::Schedule(target)
        } else {
            Transition::Apply(target)
        }
    }

    /// Set the state, returning the previous one
    pub fn set(&mut self, state: ComplianceState) -> ComplianceState {
        std::mem::replace(&mut self.state, state)
    }

    /// Register a new pending settle, cancelling any earlier one.
    ///
    /// Returns the generation the timer must present to [`take_pending`](Self::take_pending).
    pub fn arm(&mut self, state: ComplianceState) -> u64 {
        self.cancel_pending();
        self.generation += 1;
        self.pending = Some(PendingSettle {
            generation: self.generation,
            state,
            timer: None,
        });
        self.generation
    }

    /// Hand the timer task for `generation` to the cell so it can be aborted
    pub fn attach_timer(&mut self, generation: u64, timer: JoinHandle<()>) {
        match self.pending.as_mut() {
            Some(pending) if pending.generation == generation => pending.timer = Some(timer),
            // superseded before the handle arrived
            _ => timer.abort(),
        }
    }

    /// Drop the pending settle, if any. Returns whether one was dropped.
    pub fn cancel_pending(&mut self) -> bool {
        self.generation += 1;
        match self.pending.take() {
            Some(pending) => {
                if let Some(timer) = pending.timer {
                    // no-op if the timer already fired
                    timer.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Claim the pending settle for a firing timer.
    ///
    /// Returns `None` when the settle was cancelled or replaced since the timer
    /// was armed.
    pub fn take_pending(&mut self, generation: u64) -> Option<ComplianceState> {
        match self.pending.as_ref() {
            Some(pending) if pending.generation == generation => {
                self.pending.take().map(|p| p.state)
            }
            _ => None,
        }
    }

    /// Cancel any pending settle and go back to `Unknown`; returns the previous state
    pub fn reset(&mut self) -> ComplianceState {
        self.cancel_pending();
        self.set(ComplianceState::Unknown)
    }
}

impl Drop for StateCell {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
