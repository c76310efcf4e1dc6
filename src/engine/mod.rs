//! Scheduling engine: task store, agent registry, learning value scoring and
//! the [`Scheduler`] that ties them together.

pub mod events;
pub mod learning;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use events::SchedulerEvent;
pub use learning::{calculate_learning_value, unfamiliar_skills};
pub use registry::AgentRegistry;
pub use scheduler::Scheduler;
pub use stats::SchedulerStats;
pub use store::{StateCounts, TaskRecord, TaskStore};
