//! Observation sink: the engine's outbound event surface.
//!
//! The engine reports run lifecycle events, per-step outcomes, and log
//! lines here. The sink is also the system of record for each step's last
//! recorded outcome, which the engine reads back for dependency gating.

use crate::domain::outcome::{RunState, StepOutcome};
use crate::domain::StepId;
use crate::types::LogLevel;

/// Receives lifecycle events from the engine.
///
/// All calls are made synchronously from the engine's main pass; an
/// implementation must not block for long. Apart from
/// [`ObservationSink::last_outcome`], the engine never reads state back
/// from the sink.
pub trait ObservationSink: Send + Sync {
    /// A run of the named flow has started
    fn run_started(&self, flow_name: &str);

    /// A step's recorded outcome changed
    fn step_status_changed(&self, step_id: &StepId, outcome: &StepOutcome);

    /// A log line, optionally attributed to a step
    fn log(&self, level: LogLevel, step_id: Option<&StepId>, message: &str);

    /// The run reached a terminal status
    fn run_completed(&self, status: RunState);

    /// The last recorded outcome for a step, used for dependency gating
    fn last_outcome(&self, step_id: &StepId) -> Option<StepOutcome>;
}

/// In-memory implementation for testing and embedding
#[cfg(feature = "testing")]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::RwLock;

    /// A recorded log line
    #[derive(Debug, Clone)]
    pub struct LogLine {
        /// Severity of the line
        pub level: LogLevel,

        /// Step the line is attributed to, if any
        pub step_id: Option<StepId>,

        /// The message text
        pub message: String,
    }

    /// In-memory observation sink backed by concurrent maps.
    ///
    /// Keeps the last outcome per step, the full log stream, and the list
    /// of terminal run statuses in arrival order.
    pub struct MemorySink {
        outcomes: DashMap<String, StepOutcome>,
        logs: RwLock<Vec<LogLine>>,
        runs_started: RwLock<Vec<String>>,
        runs_completed: RwLock<Vec<RunState>>,
    }

    impl MemorySink {
        /// Create an empty sink
        pub fn new() -> Self {
            Self {
                outcomes: DashMap::with_capacity(16),
                logs: RwLock::new(Vec::new()),
                runs_started: RwLock::new(Vec::new()),
                runs_completed: RwLock::new(Vec::new()),
            }
        }

        /// All log lines recorded so far
        pub fn log_lines(&self) -> Vec<LogLine> {
            self.logs.read().expect("sink log lock poisoned").clone()
        }

        /// Names of flows whose runs started
        pub fn started_flows(&self) -> Vec<String> {
            self.runs_started
                .read()
                .expect("sink run lock poisoned")
                .clone()
        }

        /// Terminal statuses of completed runs, in arrival order
        pub fn completed_runs(&self) -> Vec<RunState> {
            self.runs_completed
                .read()
                .expect("sink run lock poisoned")
                .clone()
        }

        /// Convenience: the status recorded for a step, if any
        pub fn status_of(&self, step_id: &StepId) -> Option<crate::domain::outcome::StepStatus> {
            self.last_outcome(step_id).map(|o| o.status)
        }
    }

    impl Default for MemorySink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ObservationSink for MemorySink {
        fn run_started(&self, flow_name: &str) {
            self.runs_started
                .write()
                .expect("sink run lock poisoned")
                .push(flow_name.to_string());
        }

        fn step_status_changed(&self, step_id: &StepId, outcome: &StepOutcome) {
            self.outcomes.insert(step_id.0.clone(), outcome.clone());
        }

        fn log(&self, level: LogLevel, step_id: Option<&StepId>, message: &str) {
            self.logs
                .write()
                .expect("sink log lock poisoned")
                .push(LogLine {
                    level,
                    step_id: step_id.cloned(),
                    message: message.to_string(),
                });
        }

        fn run_completed(&self, status: RunState) {
            self.runs_completed
                .write()
                .expect("sink run lock poisoned")
                .push(status);
        }

        fn last_outcome(&self, step_id: &StepId) -> Option<StepOutcome> {
            self.outcomes.get(&step_id.0).map(|o| o.value().clone())
        }
    }

}
