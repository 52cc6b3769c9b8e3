use crate::application::enrichment::{self, EnrichmentItem};
use crate::domain::context::RunContext;
use crate::domain::flow::{Flow, Step, StepId};
use crate::domain::graph::execution_order;
use crate::domain::outcome::{RunState, SkipReason, StepOutcome};
use crate::executor::{ReceiptFetcher, SessionProvider, StepExecutor};
use crate::observer::ObservationSink;
use crate::types::{LogLevel, OutputMap, TX_HASH_KEY};
use crate::EngineError;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// The flow execution engine.
///
/// Owns the single run slot: at most one flow run is active at a time, and
/// all control surfaces (`start`, `pause`, `resume`, `stop`,
/// `execute_step`) go through this object. Steps execute strictly one
/// after another in topological order; cancellation is cooperative and
/// pause takes effect at step boundaries only.
pub struct FlowEngine {
    executor: Arc<dyn StepExecutor>,
    session: Arc<dyn SessionProvider>,
    sink: Arc<dyn ObservationSink>,
    receipts: Option<Arc<dyn ReceiptFetcher>>,
    inner: Mutex<EngineInner>,
}

/// Mutable engine state behind the lock
struct EngineInner {
    state: RunState,
    context: Option<Arc<RunContext>>,
    /// Completed by `resume()` or `stop()` while the main pass is parked
    pause_gate: Option<oneshot::Sender<()>>,
    /// Receipt lookups queued during the main pass
    enrichment: Vec<EnrichmentItem>,
}

impl FlowEngine {
    /// Create an engine with the given collaborators
    pub fn new(
        executor: Arc<dyn StepExecutor>,
        session: Arc<dyn SessionProvider>,
        sink: Arc<dyn ObservationSink>,
    ) -> Self {
        Self {
            executor,
            session,
            sink,
            receipts: None,
            inner: Mutex::new(EngineInner {
                state: RunState::Idle,
                context: None,
                pause_gate: None,
                enrichment: Vec::new(),
            }),
        }
    }

    /// Enable post-run receipt enrichment with the given fetcher
    pub fn with_receipt_fetcher(mut self, receipts: Arc<dyn ReceiptFetcher>) -> Self {
        self.receipts = Some(receipts);
        self
    }

    /// The current run state
    pub fn state(&self) -> RunState {
        self.lock_inner().state
    }

    /// Run a flow to completion.
    ///
    /// Fails with [`EngineError::AlreadyRunning`] unless the engine is
    /// idle and with [`EngineError::NotConnected`] without a live network
    /// session. Resolves once the run reaches a terminal state, or with
    /// the first unrecovered step error.
    pub async fn start(&self, flow: Flow) -> Result<(), EngineError> {
        let (ctx, order) = {
            let mut inner = self.lock_inner();
            if inner.state != RunState::Idle {
                return Err(EngineError::AlreadyRunning);
            }
            if !self.session.is_connected() {
                return Err(EngineError::NotConnected);
            }

            flow.validate()?;
            let order = execution_order(&flow)?;

            let ctx = Arc::new(RunContext::new(flow));
            inner.state = RunState::Running;
            inner.context = Some(ctx.clone());
            inner.enrichment.clear();
            (ctx, order)
        };

        tracing::info!(
            run_id = %ctx.run_id(),
            flow = %ctx.flow().name,
            steps = order.len(),
            "Run started"
        );
        self.sink.run_started(&ctx.flow().name);
        self.sink.log(
            LogLevel::Info,
            None,
            &format!("Run started: {}", ctx.flow().name),
        );

        // Reset the outcome table for this run
        for step in &ctx.flow().steps {
            self.sink.step_status_changed(&step.id, &StepOutcome::pending());
        }

        match self.main_pass(&ctx, &order).await {
            Ok(()) => {
                self.drain_enrichment().await;
                self.finish(&ctx, RunState::Completed);
                Ok(())
            }
            Err(err @ (EngineError::RunAborted | EngineError::RunStopped)) => {
                // stop() already reported the terminal status and reset the
                // state machine; don't report twice.
                tracing::warn!(run_id = %ctx.run_id(), error = %err, "Run aborted");
                Err(err)
            }
            Err(err) => {
                self.drain_enrichment().await;
                self.sink.log(LogLevel::Error, None, &format!("Run failed: {}", err));
                self.finish(&ctx, RunState::Failed);
                Err(err)
            }
        }
    }

    /// Suspend the run at the next step boundary.
    ///
    /// Fails with [`EngineError::NotRunning`] unless a run is in progress.
    /// The step currently in flight is never interrupted.
    pub fn pause(&self) -> Result<(), EngineError> {
        {
            let mut inner = self.lock_inner();
            if inner.state != RunState::Running {
                return Err(EngineError::NotRunning);
            }
            inner.state = RunState::Paused;
        }

        tracing::info!("Run pause requested");
        self.sink.log(LogLevel::Info, None, "Run paused");
        Ok(())
    }

    /// Release a paused run.
    ///
    /// Fails with [`EngineError::NotPaused`] unless the run is paused.
    pub fn resume(&self) -> Result<(), EngineError> {
        let gate = {
            let mut inner = self.lock_inner();
            if inner.state != RunState::Paused {
                return Err(EngineError::NotPaused);
            }
            inner.state = RunState::Running;
            inner.pause_gate.take()
        };

        // The gate only exists once the loop actually parked; a
        // pause/resume cycle between two boundaries has nothing to wake.
        if let Some(tx) = gate {
            let _ = tx.send(());
        }

        tracing::info!("Run resumed");
        self.sink.log(LogLevel::Info, None, "Run resumed");
        Ok(())
    }

    /// Stop the active run.
    ///
    /// No-op when idle. Signals the cancellation token, releases a pending
    /// pause so the suspended loop can observe the cancellation, forces
    /// the run into `Failed`, and resets to `Idle`, discarding the
    /// context. In-flight domain calls are not preempted; only the next
    /// step is prevented from starting.
    pub fn stop(&self) {
        let (gate, ctx) = {
            let mut inner = self.lock_inner();
            if inner.state == RunState::Idle {
                return;
            }
            inner.state = RunState::Failed;
            inner.enrichment.clear();
            (inner.pause_gate.take(), inner.context.take())
        };

        if let Some(ctx) = &ctx {
            ctx.cancellation().cancel();
            tracing::warn!(run_id = %ctx.run_id(), "Run stopped by user");
        }
        if let Some(tx) = gate {
            let _ = tx.send(());
        }

        self.sink.log(LogLevel::Warn, None, "Run stopped by user");
        self.sink.run_completed(RunState::Failed);

        self.lock_inner().state = RunState::Idle;
    }

    /// Execute a single step of the current flow.
    ///
    /// Fails with [`EngineError::NoContext`] when no run context exists
    /// and [`EngineError::StepNotFound`] for an unknown step ID. Used by
    /// the main pass and for single-step re-execution.
    pub async fn execute_step(&self, step_id: &StepId) -> Result<OutputMap, EngineError> {
        let ctx = self
            .lock_inner()
            .context
            .clone()
            .ok_or(EngineError::NoContext)?;

        let step = ctx
            .flow()
            .step(step_id)
            .cloned()
            .ok_or_else(|| EngineError::StepNotFound(step_id.0.clone()))?;

        self.run_step(&ctx, &step).await
    }

    /// The sequential main pass over the topological order
    async fn main_pass(&self, ctx: &Arc<RunContext>, order: &[StepId]) -> Result<(), EngineError> {
        for step_id in order {
            // Cancellation is only observed between steps.
            if ctx.cancellation().is_cancelled() {
                return Err(EngineError::RunAborted);
            }

            // Pause boundary: park until resume() or stop() completes the
            // gate, then re-check where the release left us.
            let gate = {
                let mut inner = self.lock_inner();
                if inner.state == RunState::Paused {
                    let (tx, rx) = oneshot::channel();
                    inner.pause_gate = Some(tx);
                    Some(rx)
                } else {
                    None
                }
            };
            if let Some(rx) = gate {
                tracing::debug!(step_id = %step_id, "Run parked at step boundary");
                let _ = rx.await;
                if self.state() != RunState::Running {
                    return Err(EngineError::RunStopped);
                }
            }

            let step = ctx
                .flow()
                .step(step_id)
                .cloned()
                .ok_or_else(|| EngineError::StepNotFound(step_id.0.clone()))?;

            // Comments are canvas annotations; they never execute and
            // never produce outputs.
            if step.is_comment() {
                self.sink
                    .step_status_changed(&step.id, &StepOutcome::skipped(SkipReason::Comment));
                continue;
            }

            // Dependency gating: every direct dependency must have
            // recorded success. A gap here skips the step, it does not
            // fail the run.
            let deps = ctx.flow().dependencies_of(step_id);
            let unmet = deps.iter().find(|dep| {
                !self
                    .sink
                    .last_outcome(dep)
                    .map(|o| o.is_success())
                    .unwrap_or(false)
            });
            if let Some(dep) = unmet {
                tracing::debug!(step_id = %step.id, dependency = %dep, "Dependencies not met");
                self.sink.step_status_changed(
                    &step.id,
                    &StepOutcome::skipped(SkipReason::DependenciesNotMet),
                );
                self.sink.log(
                    LogLevel::Warn,
                    Some(&step.id),
                    &format!("Step skipped, dependency not met: {}", dep),
                );
                continue;
            }

            if let Err(err) = self.run_step(ctx, &step).await {
                // A pause that raced the failing step keeps the run
                // alive; the loop re-parks at the next boundary.
                if self.state() == RunState::Paused {
                    tracing::warn!(
                        step_id = %step.id,
                        error = %err,
                        "Step failed while run paused"
                    );
                    continue;
                }
                return Err(err);
            }
        }

        Ok(())
    }

    /// Execute one step: gather inputs, dispatch, record the outcome
    async fn run_step(&self, ctx: &Arc<RunContext>, step: &Step) -> Result<OutputMap, EngineError> {
        tracing::debug!(
            run_id = %ctx.run_id(),
            step_id = %step.id,
            kind = %step.kind,
            "Executing step"
        );
        self.sink.step_status_changed(&step.id, &StepOutcome::running());
        self.sink.log(
            LogLevel::Info,
            Some(&step.id),
            &format!("Step started: {}", step_label(step)),
        );

        let inputs = gather_inputs(ctx, step);

        match self.executor.execute(step, inputs, ctx).await {
            Ok(outputs) => {
                let tx_hash = outputs
                    .get(TX_HASH_KEY)
                    .and_then(|v| v.as_str())
                    .map(String::from);

                ctx.record_output(step.id.clone(), outputs.clone());

                if let Some(hash) = &tx_hash {
                    self.lock_inner().enrichment.push(EnrichmentItem {
                        step_id: step.id.clone(),
                        tx_hash: hash.clone(),
                    });
                }

                self.sink.step_status_changed(
                    &step.id,
                    &StepOutcome::success(outputs.clone(), tx_hash),
                );
                self.sink.log(
                    LogLevel::Info,
                    Some(&step.id),
                    &format!("Step succeeded: {}", step_label(step)),
                );

                Ok(outputs)
            }
            Err(err) => {
                tracing::warn!(
                    run_id = %ctx.run_id(),
                    step_id = %step.id,
                    error = %err,
                    "Step execution failed"
                );
                self.sink
                    .step_status_changed(&step.id, &StepOutcome::error(err.to_string()));
                self.sink.log(
                    LogLevel::Error,
                    Some(&step.id),
                    &format!("Step failed: {}", err),
                );

                Err(err)
            }
        }
    }

    /// Drain queued receipt lookups; failures never surface
    async fn drain_enrichment(&self) {
        let items = std::mem::take(&mut self.lock_inner().enrichment);

        let Some(receipts) = self.receipts.clone() else {
            return;
        };

        enrichment::drain(items, receipts, self.sink.clone()).await;
    }

    /// Report the terminal status and return the engine to idle
    fn finish(&self, ctx: &Arc<RunContext>, terminal: RunState) {
        {
            let mut inner = self.lock_inner();
            inner.state = RunState::Idle;
            inner.context = None;
            inner.pause_gate = None;
        }

        tracing::info!(run_id = %ctx.run_id(), status = ?terminal, "Run finished");
        self.sink.run_completed(terminal);
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        self.inner.lock().expect("engine state lock poisoned")
    }
}

/// A step's display name for messages
fn step_label(step: &Step) -> &str {
    if step.label.is_empty() {
        &step.id.0
    } else {
        &step.label
    }
}

/// Build a step's input record.
///
/// Precedence is first-write-wins across three sources: (a) declared edges
/// targeting the step, copying port-specific values and spreading whole
/// records for generic edges; (b) namespaced `<stepId>.<key>` entries for
/// every completed step regardless of connectivity; (c) `var:<name>`
/// entries for every run variable.
fn gather_inputs(ctx: &RunContext, step: &Step) -> OutputMap {
    let mut inputs = OutputMap::new();

    for edge in ctx.flow().edges.iter().filter(|e| e.target == step.id) {
        let Some(record) = ctx.output_of(&edge.source) else {
            continue;
        };

        if let Some(value) = record.get(&edge.source_port) {
            inputs
                .entry(edge.target_port.clone())
                .or_insert_with(|| value.clone());
        }

        if edge.uses_default_ports() || !record.contains_key(&edge.source_port) {
            for (key, value) in &record {
                inputs.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    for source in &ctx.flow().steps {
        let Some(record) = ctx.output_of(&source.id) else {
            continue;
        };
        for (key, value) in &record {
            inputs
                .entry(format!("{}.{}", source.id, key))
                .or_insert_with(|| value.clone());
        }
    }

    for (name, value) in ctx.variables() {
        inputs
            .entry(format!("var:{}", name))
            .or_insert_with(|| value.clone());
    }

    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{Edge, FlowId, Variable, PORT_INPUT, PORT_OUTPUT};
    use serde_json::json;
    use std::collections::HashMap;

    fn step(id: &str, kind: &str) -> Step {
        Step {
            id: StepId(id.to_string()),
            kind: kind.to_string(),
            label: String::new(),
            config: HashMap::new(),
        }
    }

    fn generic_edge(source: &str, target: &str) -> Edge {
        Edge {
            source: StepId(source.to_string()),
            source_port: PORT_OUTPUT.to_string(),
            target: StepId(target.to_string()),
            target_port: PORT_INPUT.to_string(),
        }
    }

    fn outputs(pairs: &[(&str, serde_json::Value)]) -> OutputMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn two_step_flow(edges: Vec<Edge>) -> Flow {
        Flow {
            id: FlowId("gather".to_string()),
            name: "gather".to_string(),
            steps: vec![step("a", "GenerateKeys"), step("b", "Faucet")],
            edges,
            variables: vec![Variable {
                name: "network".to_string(),
                default: Some(json!("testnet")),
            }],
        }
    }

    #[test]
    fn test_gather_spreads_generic_edge_record() {
        let ctx = RunContext::new(two_step_flow(vec![generic_edge("a", "b")]));
        ctx.record_output(
            StepId("a".to_string()),
            outputs(&[("public_key", json!("pk")), ("lite_identity", json!("acc://li"))]),
        );

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        assert_eq!(inputs["public_key"], json!("pk"));
        assert_eq!(inputs["lite_identity"], json!("acc://li"));
    }

    #[test]
    fn test_gather_copies_named_port_under_target_name() {
        let edge = Edge {
            source: StepId("a".to_string()),
            source_port: "public_key".to_string(),
            target: StepId("b".to_string()),
            target_port: "signer_key".to_string(),
        };
        let ctx = RunContext::new(two_step_flow(vec![edge]));
        ctx.record_output(
            StepId("a".to_string()),
            outputs(&[("public_key", json!("pk"))]),
        );

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        assert_eq!(inputs["signer_key"], json!("pk"));
        // Named port present in the record: no whole-record spread.
        assert!(!inputs.contains_key("public_key"));
    }

    #[test]
    fn test_gather_spreads_when_named_port_is_absent() {
        let edge = Edge {
            source: StepId("a".to_string()),
            source_port: "missing_port".to_string(),
            target: StepId("b".to_string()),
            target_port: "signer_key".to_string(),
        };
        let ctx = RunContext::new(two_step_flow(vec![edge]));
        ctx.record_output(
            StepId("a".to_string()),
            outputs(&[("public_key", json!("pk"))]),
        );

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        assert_eq!(inputs["public_key"], json!("pk"));
        assert!(!inputs.contains_key("signer_key"));
    }

    #[test]
    fn test_gather_exposes_namespaced_keys_without_edges() {
        let ctx = RunContext::new(two_step_flow(vec![]));
        ctx.record_output(StepId("a".to_string()), outputs(&[("x", json!(1))]));

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        assert_eq!(inputs["a.x"], json!(1));
        // No declared edge: no un-namespaced copy.
        assert!(!inputs.contains_key("x"));
    }

    #[test]
    fn test_gather_exposes_variables() {
        let ctx = RunContext::new(two_step_flow(vec![]));

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        assert_eq!(inputs["var:network"], json!("testnet"));
    }

    #[test]
    fn test_gather_first_write_wins() {
        // Edge copy lands "output" keys before the namespaced pass; a
        // colliding namespaced key must not overwrite.
        let ctx = RunContext::new(two_step_flow(vec![generic_edge("a", "b")]));
        ctx.record_output(
            StepId("a".to_string()),
            outputs(&[("a.x", json!("from-record")), ("x", json!(2))]),
        );

        let inputs = gather_inputs(&ctx, ctx.flow().step(&StepId("b".to_string())).unwrap());

        // The spread wrote "a.x" first; the namespaced pass must not
        // replace it with the namespaced form of "x"... which is also
        // "a.x".
        assert_eq!(inputs["a.x"], json!("from-record"));
        assert_eq!(inputs["x"], json!(2));
    }

    #[test]
    fn test_step_label_falls_back_to_id() {
        let mut s = step("fund", "Faucet");
        assert_eq!(step_label(&s), "fund");

        s.label = "Fund account".to_string();
        assert_eq!(step_label(&s), "Fund account");
    }
}
