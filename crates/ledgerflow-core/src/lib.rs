//!
//! LedgerFlow Core - the flow execution engine
//!
//! This crate turns a declarative graph of account-lifecycle steps into an
//! ordered, resumable, cancellable run. It owns the run-state machine,
//! dependency gating, output propagation, and post-run receipt
//! enrichment; the domain actions themselves live behind the
//! [`StepExecutor`] contract, and run observation behind
//! [`ObservationSink`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - the flow graph model and per-run state
pub mod domain;

/// Application services - the flow execution engine
pub mod application;

/// External contracts: step executor, session gate, receipt fetcher
pub mod executor;

/// Observation sink for run lifecycle events
pub mod observer;

/// Core types
pub mod types;

/// Error types
pub mod error;

// Re-export main API types for easy use
pub use application::engine::FlowEngine;
pub use domain::context::RunContext;
pub use domain::flow::{
    Edge, Flow, FlowId, RunId, Step, StepId, Variable, COMMENT_KIND, PORT_INPUT, PORT_OUTPUT,
};
pub use domain::graph::execution_order;
pub use domain::outcome::{RunState, SkipReason, StepOutcome, StepStatus};
pub use error::EngineError;
pub use executor::{ReceiptFetcher, SessionProvider, StepExecutor};
pub use observer::ObservationSink;
pub use types::{LogLevel, OutputMap, TX_HASH_KEY};
