//!
//! LedgerFlow Stdlib - account-lifecycle step executors
//!
//! Provides the standard [`LedgerStepExecutor`] that the engine dispatches
//! to: one behavior per step kind, each a thin mapping from step
//! configuration and gathered inputs onto an SDK proxy call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Step kind discriminators
pub mod kinds;

/// The standard step executor
pub mod executor;

pub use executor::LedgerStepExecutor;
