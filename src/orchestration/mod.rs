//! Orchestration layer.
//!
//! Hosts that want the scheduler to drive real work plug a [`TaskExecutor`]
//! into a [`Dispatcher`], which runs every registered agent concurrently
//! until the queue can make no further progress.

mod dispatcher;
mod executor;

pub use dispatcher::{CompletedTask, Dispatcher, FailedAttempt, RunSummary};
pub use executor::{SimulatedExecutor, TaskExecutor};
