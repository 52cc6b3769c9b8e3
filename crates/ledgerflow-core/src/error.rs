use crate::domain::flow::StepId;
use thiserror::Error;

/// Core error type for the LedgerFlow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A run is already in progress
    #[error("A run is already in progress")]
    AlreadyRunning,

    /// No run is in progress
    #[error("No run is in progress")]
    NotRunning,

    /// The run is not paused
    #[error("The run is not paused")]
    NotPaused,

    /// No execution context is active
    #[error("No execution context is active")]
    NoContext,

    /// Step not found in the current flow
    #[error("Step not found: {0}")]
    StepNotFound(String),

    /// No connected network session
    #[error("No connected network session")]
    NotConnected,

    /// Flow validation error
    #[error("Flow validation error: {0}")]
    Validation(String),

    /// The flow contains a dependency cycle
    #[error("Flow contains a dependency cycle involving steps: {0:?}")]
    CyclicFlow(Vec<StepId>),

    /// Step execution error raised by the step executor
    #[error("Step execution error: {0}")]
    StepExecution(String),

    /// The run was aborted by cancellation
    #[error("Run aborted")]
    RunAborted,

    /// The run was stopped while suspended
    #[error("Run stopped")]
    RunStopped,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<String> for EngineError {
    fn from(err: String) -> Self {
        EngineError::Other(err)
    }
}

impl From<&str> for EngineError {
    fn from(err: &str) -> Self {
        EngineError::Other(err.to_string())
    }
}
