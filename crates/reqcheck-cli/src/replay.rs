//! Timed raw-feed scenarios

use reqcheck_core::{ComplianceState, RawCompliance, SubjectId};
use reqcheck_engine::{ComplianceSession, EngineConfig, MetricsSnapshot, StateChange};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Extra wait after the last event so its settle can land
const QUIET_MARGIN: Duration = Duration::from_millis(50);

/// A replayable sequence of raw compliance events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    /// Containment chain to set up before replaying
    #[serde(default)]
    pub consumers: Vec<ConsumerSpec>,

    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerSpec {
    pub subject: SubjectId,

    #[serde(default)]
    pub parent: Option<SubjectId>,

    /// Only links the chain, holds no state
    #[serde(default)]
    pub structural: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Offset from the start of the replay
    pub at_ms: u64,
    pub subject: SubjectId,
    pub value: RawCompliance,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read scenario {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }
}

/// A state change and when it was observed
#[derive(Debug, Clone, Serialize)]
pub struct TimedChange {
    pub at_ms: u64,
    #[serde(flatten)]
    pub change: StateChange,
}

/// Outcome of a replay
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub changes: Vec<TimedChange>,
    pub final_states: Vec<(SubjectId, ComplianceState)>,
    pub metrics: MetricsSnapshot,
}

/// Publish every event at its offset, then wait one settle delay for the
/// engine to go quiet.
pub async fn replay(scenario: &Scenario, config: EngineConfig) -> anyhow::Result<ReplayReport> {
    let settle_delay = config.settle_delay();
    let session = ComplianceSession::start(config);

    for consumer in &scenario.consumers {
        let aggregator = session.aggregator();
        if consumer.structural {
            aggregator.attach_structural(consumer.subject.clone(), consumer.parent.clone())?;
        } else {
            aggregator.attach(consumer.subject.clone(), consumer.parent.clone())?;
        }
    }

    let start = Instant::now();
    let mut receiver = session.states().subscribe();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let collector = tokio::spawn(async move {
        let mut changes = Vec::new();
        loop {
            tokio::select! {
                biased;
                received = receiver.recv() => match received {
                    Ok(change) => changes.push(TimedChange {
                        at_ms: start.elapsed().as_millis() as u64,
                        change,
                    }),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Replay missed state changes");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut stop_rx => break,
            }
        }
        changes
    });

    let mut events = scenario.events.clone();
    events.sort_by_key(|event| event.at_ms);
    tracing::info!(scenario = %scenario.name, events = events.len(), "Replaying scenario");

    for event in events {
        tokio::time::sleep_until(start + Duration::from_millis(event.at_ms)).await;
        tracing::debug!(subject = %event.subject, at_ms = event.at_ms, "Publishing raw event");
        session.publish_raw(event.subject, event.value);
    }

    tokio::time::sleep(settle_delay + QUIET_MARGIN).await;
    let _ = stop_tx.send(());
    let changes = collector.await?;

    Ok(ReplayReport {
        changes,
        final_states: session.aggregator().states(),
        metrics: session.aggregator().metrics().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNCING_ROW: &str = r#"
name: bouncing-row
consumers:
  - subject: requirement
  - subject: row
    parent: requirement
events:
  - at_ms: 0
    subject: requirement
    value:
      settled: true
  - at_ms: 10
    subject: row
    value: calculating
  - at_ms: 20
    subject: row
    value:
      settled: false
  - at_ms: 120
    subject: row
    value:
      settled: true
"#;

    #[test]
    fn test_scenario_parsing() {
        let scenario = Scenario::from_yaml(BOUNCING_ROW).unwrap();
        assert_eq!(scenario.name, "bouncing-row");
        assert_eq!(scenario.consumers.len(), 2);
        assert_eq!(scenario.consumers[1].parent, Some(SubjectId::new("requirement")));
        assert_eq!(scenario.events[1].value, RawCompliance::Calculating);
        assert_eq!(scenario.events[3].value, RawCompliance::Settled(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_debounces_and_invalidates() {
        let scenario = Scenario::from_yaml(BOUNCING_ROW).unwrap();
        let report = replay(&scenario, EngineConfig::default().with_settle_delay_ms(200))
            .await
            .unwrap();

        let row: Vec<_> = report
            .changes
            .iter()
            .filter(|c| c.change.subject.as_str() == "row")
            .collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].change.current, ComplianceState::Calculating);
        assert_eq!(row[1].change.current, ComplianceState::Compliant);
        // one settle delay after the last row event, not after the first
        assert!((320..330).contains(&row[1].at_ms));

        assert_eq!(
            report.final_states,
            vec![
                (SubjectId::new("requirement"), ComplianceState::Unknown),
                (SubjectId::new("row"), ComplianceState::Compliant),
            ]
        );
        assert_eq!(report.metrics.events, 4);
        assert_eq!(report.metrics.superseded, 1);
    }
}
