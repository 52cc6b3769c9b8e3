use crate::types::OutputMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run status of the engine's single logical run slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run is active
    Idle,

    /// A run is executing its main pass
    Running,

    /// A run is suspended at a step boundary
    Paused,

    /// The run finished successfully
    Completed,

    /// The run failed or was stopped
    Failed,
}

/// Externally observed status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The step has not been reached yet
    Pending,

    /// The step executor is currently running the step
    Running,

    /// The step finished and recorded its outputs
    Success,

    /// The step executor raised an error
    Error,

    /// The step was skipped without executing
    Skipped,
}

/// Why a step was skipped instead of executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The step is a comment annotation
    Comment,

    /// At least one dependency did not finish with success
    DependenciesNotMet,
}

/// The recorded outcome of one step, as reported to the observation sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Current status
    pub status: StepStatus,

    /// Output record, present once the step succeeded
    pub outputs: Option<OutputMap>,

    /// Error message, present once the step failed
    pub error: Option<String>,

    /// Domain result handle (transaction hash) used for enrichment
    pub tx_hash: Option<String>,

    /// Settlement receipt attached by post-run enrichment
    pub receipt: Option<serde_json::Value>,

    /// Reason the step was skipped, if it was
    pub skip_reason: Option<SkipReason>,

    /// When this outcome was recorded
    pub recorded_at: DateTime<Utc>,
}

impl StepOutcome {
    fn base(status: StepStatus) -> Self {
        Self {
            status,
            outputs: None,
            error: None,
            tx_hash: None,
            receipt: None,
            skip_reason: None,
            recorded_at: Utc::now(),
        }
    }

    /// Outcome for a step that has not been reached yet
    pub fn pending() -> Self {
        Self::base(StepStatus::Pending)
    }

    /// Outcome for a step currently executing
    pub fn running() -> Self {
        Self::base(StepStatus::Running)
    }

    /// Outcome for a step that finished with the given output record
    pub fn success(outputs: OutputMap, tx_hash: Option<String>) -> Self {
        Self {
            outputs: Some(outputs),
            tx_hash,
            ..Self::base(StepStatus::Success)
        }
    }

    /// Outcome for a step whose executor raised an error
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::base(StepStatus::Error)
        }
    }

    /// Outcome for a step that was skipped
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skip_reason: Some(reason),
            ..Self::base(StepStatus::Skipped)
        }
    }

    /// The same outcome with a settlement receipt attached
    pub fn with_receipt(mut self, receipt: serde_json::Value) -> Self {
        self.receipt = Some(receipt);
        self
    }

    /// Whether this outcome counts as a satisfied dependency
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_outcome_carries_outputs_and_handle() {
        let mut outputs = OutputMap::new();
        outputs.insert("tx_hash".to_string(), json!("abc123"));

        let outcome = StepOutcome::success(outputs, Some("abc123".to_string()));

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(outcome.is_success());
        assert_eq!(outcome.tx_hash.as_deref(), Some("abc123"));
        assert!(outcome.error.is_none());
        assert!(outcome.skip_reason.is_none());
    }

    #[test]
    fn test_error_outcome_keeps_message() {
        let outcome = StepOutcome::error("boom");

        assert_eq!(outcome.status, StepStatus::Error);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error.as_deref(), Some("boom"));
        assert!(outcome.outputs.is_none());
    }

    #[test]
    fn test_skipped_outcome_records_reason() {
        let outcome = StepOutcome::skipped(SkipReason::DependenciesNotMet);

        assert_eq!(outcome.status, StepStatus::Skipped);
        assert_eq!(outcome.skip_reason, Some(SkipReason::DependenciesNotMet));
    }

    #[test]
    fn test_with_receipt_preserves_status() {
        let outcome = StepOutcome::success(OutputMap::new(), Some("abc".to_string()))
            .with_receipt(json!({"settled": true}));

        assert_eq!(outcome.status, StepStatus::Success);
        assert_eq!(outcome.receipt.unwrap()["settled"], json!(true));
    }

    #[test]
    fn test_run_state_serialization() {
        let serialized = serde_json::to_string(&RunState::Paused).unwrap();
        let deserialized: RunState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, RunState::Paused);
    }
}
