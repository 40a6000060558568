//! Structured per-stage telemetry.
//!
//! A [`TelemetrySink`] is created per pipeline invocation and threaded
//! through the stages as a value; there is no process-wide singleton. Each
//! invocation produces exactly one root event with one child event per
//! executed stage. Events are mirrored to the `log` facade.

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    Degraded,
    Failed,
    Skipped,
}

/// One recorded stage execution.
///
/// `extras` carries small key-value context (attempt number, engine id);
/// callers must not put credentials or raw audio into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// Seconds since the Unix epoch when the stage finished
    pub timestamp_epoch: u64,
    /// Stage name (e.g. `preprocess`, `transcribe`)
    pub stage: String,
    /// Component that ran the stage (e.g. `normalizer`, `ensemble`)
    pub component: String,
    pub duration_ms: u64,
    pub outcome: StageOutcome,
    pub extras: Vec<(String, String)>,
}

/// Collected telemetry of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTrace {
    /// Root label, one per invocation
    pub root: String,
    pub total_duration_ms: u64,
    pub stages: Vec<StageEvent>,
}

/// Per-invocation event sink.
pub struct TelemetrySink {
    root: String,
    started: Instant,
    events: Mutex<Vec<StageEvent>>,
}

impl TelemetrySink {
    /// Start a sink for one invocation; `root` names the operation.
    pub fn new(root: &str) -> Self {
        debug!("Telemetry root started: {root}");
        Self {
            root: root.to_string(),
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Record a finished stage.
    pub fn record(
        &self,
        stage: &str,
        component: &str,
        duration_ms: u64,
        outcome: StageOutcome,
        extras: Vec<(String, String)>,
    ) {
        debug!(
            "[{}] stage={stage} component={component} duration={duration_ms}ms outcome={outcome:?}",
            self.root
        );
        let event = StageEvent {
            timestamp_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            stage: stage.to_string(),
            component: component.to_string(),
            duration_ms,
            outcome,
            extras,
        };
        self.events.lock().expect("telemetry lock").push(event);
    }

    /// Time a closure as one stage, recording its duration with the given
    /// outcome derived from the return value.
    pub fn time_stage<T>(
        &self,
        stage: &str,
        component: &str,
        f: impl FnOnce() -> (T, StageOutcome),
    ) -> T {
        let started = Instant::now();
        let (value, outcome) = f();
        self.record(
            stage,
            component,
            started.elapsed().as_millis() as u64,
            outcome,
            Vec::new(),
        );
        value
    }

    /// Close the sink, producing the invocation trace.
    pub fn finish(self) -> PipelineTrace {
        let total = self.started.elapsed().as_millis() as u64;
        let stages = self.events.into_inner().expect("telemetry lock");
        debug!(
            "Telemetry root finished: {} ({} stages, {total} ms)",
            self.root,
            stages.len()
        );
        PipelineTrace {
            root: self.root,
            total_duration_ms: total,
            stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_root_many_stages() {
        let sink = TelemetrySink::new("pipeline");
        sink.record("preprocess", "normalizer", 12, StageOutcome::Ok, vec![]);
        sink.record(
            "transcribe",
            "ensemble",
            840,
            StageOutcome::Ok,
            vec![("engines".into(), "3".into())],
        );
        sink.record("validate", "quality", 3, StageOutcome::Degraded, vec![]);

        let trace = sink.finish();
        assert_eq!(trace.root, "pipeline");
        assert_eq!(trace.stages.len(), 3);
        assert_eq!(trace.stages[0].stage, "preprocess");
        assert_eq!(trace.stages[1].extras[0].1, "3");
    }

    #[test]
    fn time_stage_measures_and_returns() {
        let sink = TelemetrySink::new("pipeline");
        let value = sink.time_stage("align", "aligner", || (42, StageOutcome::Ok));
        assert_eq!(value, 42);
        let trace = sink.finish();
        assert_eq!(trace.stages.len(), 1);
        assert_eq!(trace.stages[0].component, "aligner");
    }
}
