use crate::domain::flow::{Flow, StepId};
use crate::domain::RunId;
use crate::types::OutputMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-run mutable state, exclusively owned by one engine run.
///
/// Holds the immutable flow, the append-only step output map, the resolved
/// run variables, and the cooperative cancellation token. Created at run
/// start, discarded at run end or on stop.
pub struct RunContext {
    run_id: RunId,
    flow: Arc<Flow>,
    outputs: RwLock<HashMap<StepId, OutputMap>>,
    variables: HashMap<String, serde_json::Value>,
    cancellation: CancellationToken,
}

impl RunContext {
    /// Create a fresh context for one run of the given flow.
    ///
    /// Variables are seeded once from their declared defaults; they are
    /// never mutated by steps.
    pub fn new(flow: Flow) -> Self {
        let variables = flow
            .variables
            .iter()
            .filter_map(|v| v.default.clone().map(|d| (v.name.clone(), d)))
            .collect();

        Self {
            run_id: RunId(Uuid::new_v4().to_string()),
            flow: Arc::new(flow),
            outputs: RwLock::new(HashMap::new()),
            variables,
            cancellation: CancellationToken::new(),
        }
    }

    /// The unique identifier of this run
    #[inline]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// The flow being executed
    #[inline]
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// The cooperative cancellation token for this run.
    ///
    /// Step executors with internal retry or polling loops must check it
    /// between attempts so `stop()` takes effect without killing in-flight
    /// network calls.
    #[inline]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The resolved run variables
    #[inline]
    pub fn variables(&self) -> &HashMap<String, serde_json::Value> {
        &self.variables
    }

    /// Record a finished step's output record.
    ///
    /// The output map is append-only and single-writer: the first record
    /// for a step wins and later writes for the same step are ignored.
    pub fn record_output(&self, step_id: StepId, outputs: OutputMap) {
        let mut map = self
            .outputs
            .write()
            .expect("run context output lock poisoned");
        map.entry(step_id).or_insert(outputs);
    }

    /// Get the recorded output record of a step, if it has finished
    pub fn output_of(&self, step_id: &StepId) -> Option<OutputMap> {
        let map = self
            .outputs
            .read()
            .expect("run context output lock poisoned");
        map.get(step_id).cloned()
    }

    /// Whether a step has a recorded output record
    pub fn has_output(&self, step_id: &StepId) -> bool {
        let map = self
            .outputs
            .read()
            .expect("run context output lock poisoned");
        map.contains_key(step_id)
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("flow", &self.flow.id)
            .field("variables", &self.variables.len())
            .finish()
    }
}
