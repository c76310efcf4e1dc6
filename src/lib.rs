pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod plan;
pub mod state;
pub mod util;

pub use config::{DispatchConfig, LearningWeights, SchedulerConfig};
pub use core::{
    AgentId, AgentProfile, AgentStats, Priority, Task, TaskCategory, TaskId, TaskResult,
    TaskState, Tier,
};
pub use engine::{Scheduler, SchedulerEvent, SchedulerStats, TaskRecord};
pub use error::{Error, Result};
pub use orchestration::{Dispatcher, RunSummary, SimulatedExecutor, TaskExecutor};
pub use plan::Plan;
pub use state::{SchedulerSnapshot, SnapshotStore};
