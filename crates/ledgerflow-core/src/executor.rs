//! Contracts the engine depends on: the step executor that performs domain
//! actions, the session gate checked before a run starts, and the receipt
//! fetcher used by post-run enrichment.

use crate::domain::context::RunContext;
use crate::domain::flow::Step;
use crate::types::OutputMap;
use crate::EngineError;
use async_trait::async_trait;

/// Performs the domain action behind a single step.
///
/// The engine resolves the step's inputs and calls this once per executed
/// step; what the step actually *does* (submit a transaction, query an
/// account, derive keys) is entirely the implementation's concern.
/// Reserved `"Comment"` steps are filtered out by the engine and never
/// reach an executor.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Execute one step with its gathered inputs.
    ///
    /// Implementations with internal retry or polling loops must check
    /// `ctx.cancellation()` between attempts so `stop()` is honored.
    async fn execute(
        &self,
        step: &Step,
        inputs: OutputMap,
        ctx: &RunContext,
    ) -> Result<OutputMap, EngineError>;
}

/// Gate for the domain session prerequisite.
///
/// `start()` refuses to run a flow unless a live network session exists.
pub trait SessionProvider: Send + Sync {
    /// Whether a connected session is currently available
    fn is_connected(&self) -> bool;
}

/// Best-effort settlement receipt lookup used by post-run enrichment
#[async_trait]
pub trait ReceiptFetcher: Send + Sync {
    /// Fetch the receipt for a submitted transaction hash
    async fn fetch_receipt(&self, tx_hash: &str) -> Result<serde_json::Value, EngineError>;
}

/// Scripted implementations for testing
#[cfg(feature = "testing")]
pub mod testing {
    use super::*;
    use crate::domain::StepId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted step behavior
    enum Script {
        Succeed(OutputMap),
        Fail(String),
    }

    /// Step executor driven by a per-step script.
    ///
    /// Unscripted steps succeed with an empty output record. Invocations
    /// and the input record passed for each step are recorded so tests can
    /// assert scheduling and propagation behavior.
    pub struct ScriptedExecutor {
        scripts: Mutex<HashMap<String, Script>>,
        delays: Mutex<HashMap<String, Duration>>,
        invocations: Mutex<Vec<StepId>>,
        inputs_seen: Mutex<HashMap<String, OutputMap>>,
    }

    impl ScriptedExecutor {
        /// Create an executor where every step succeeds with no outputs
        pub fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                delays: Mutex::new(HashMap::new()),
                invocations: Mutex::new(Vec::new()),
                inputs_seen: Mutex::new(HashMap::new()),
            }
        }

        /// Script a step to succeed with the given output record
        pub fn succeed_with(self, step_id: &str, outputs: OutputMap) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(step_id.to_string(), Script::Succeed(outputs));
            self
        }

        /// Script a step to fail with the given message
        pub fn fail_with(self, step_id: &str, message: &str) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(step_id.to_string(), Script::Fail(message.to_string()));
            self
        }

        /// Make a step take the given wall-clock time before finishing
        pub fn delay(self, step_id: &str, duration: Duration) -> Self {
            self.delays
                .lock()
                .unwrap()
                .insert(step_id.to_string(), duration);
            self
        }

        /// The step IDs this executor was invoked for, in order
        pub fn invocations(&self) -> Vec<StepId> {
            self.invocations.lock().unwrap().clone()
        }

        /// The input record the executor received for a step
        pub fn inputs_for(&self, step_id: &str) -> Option<OutputMap> {
            self.inputs_seen.lock().unwrap().get(step_id).cloned()
        }
    }

    impl Default for ScriptedExecutor {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl StepExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            step: &Step,
            inputs: OutputMap,
            _ctx: &RunContext,
        ) -> Result<OutputMap, EngineError> {
            self.invocations.lock().unwrap().push(step.id.clone());
            self.inputs_seen
                .lock()
                .unwrap()
                .insert(step.id.0.clone(), inputs);

            let delay = self.delays.lock().unwrap().get(&step.id.0).copied();
            if let Some(duration) = delay {
                tokio::time::sleep(duration).await;
            }

            let scripts = self.scripts.lock().unwrap();
            match scripts.get(&step.id.0) {
                Some(Script::Succeed(outputs)) => Ok(outputs.clone()),
                Some(Script::Fail(message)) => Err(EngineError::StepExecution(message.clone())),
                None => Ok(OutputMap::new()),
            }
        }
    }

    /// Session provider with a switchable connected flag
    pub struct StaticSession {
        connected: AtomicBool,
    }

    impl StaticSession {
        /// A session provider that reports connected
        pub fn connected() -> Self {
            Self {
                connected: AtomicBool::new(true),
            }
        }

        /// A session provider that reports disconnected
        pub fn disconnected() -> Self {
            Self {
                connected: AtomicBool::new(false),
            }
        }

        /// Flip the connected flag
        pub fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }
    }

    impl SessionProvider for StaticSession {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    /// Receipt fetcher driven by a per-hash script
    pub struct ScriptedReceipts {
        receipts: Mutex<HashMap<String, Result<serde_json::Value, String>>>,
        lookups: Mutex<Vec<String>>,
    }

    impl ScriptedReceipts {
        /// Create a fetcher that fails every lookup as unknown
        pub fn new() -> Self {
            Self {
                receipts: Mutex::new(HashMap::new()),
                lookups: Mutex::new(Vec::new()),
            }
        }

        /// Script a hash to resolve to the given receipt
        pub fn resolve(self, tx_hash: &str, receipt: serde_json::Value) -> Self {
            self.receipts
                .lock()
                .unwrap()
                .insert(tx_hash.to_string(), Ok(receipt));
            self
        }

        /// Script a hash to fail with the given message
        pub fn reject(self, tx_hash: &str, message: &str) -> Self {
            self.receipts
                .lock()
                .unwrap()
                .insert(tx_hash.to_string(), Err(message.to_string()));
            self
        }

        /// The hashes looked up so far, in order
        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl Default for ScriptedReceipts {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ReceiptFetcher for ScriptedReceipts {
        async fn fetch_receipt(&self, tx_hash: &str) -> Result<serde_json::Value, EngineError> {
            self.lookups.lock().unwrap().push(tx_hash.to_string());

            let receipts = self.receipts.lock().unwrap();
            match receipts.get(tx_hash) {
                Some(Ok(receipt)) => Ok(receipt.clone()),
                Some(Err(message)) => Err(EngineError::Other(message.clone())),
                None => Err(EngineError::Other(format!(
                    "Unknown transaction: {}",
                    tx_hash
                ))),
            }
        }
    }
}
