//! Events emitted by the scheduler for task and agent lifecycle changes.
//!
//! These events let hosts (dashboards, bot commands, the dispatcher) react
//! to state changes without polling.

use crate::core::agent::AgentId;
use crate::core::task::{TaskId, Tier};

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A new agent profile was created.
    AgentRegistered { agent_id: AgentId },
    /// A task entered the queue.
    TaskQueued { task_id: TaskId },
    /// A task was handed to an agent.
    TaskAssigned { task_id: TaskId, agent_id: AgentId },
    /// An agent finished a task successfully.
    TaskCompleted {
        task_id: TaskId,
        agent_id: AgentId,
        learning_gained: f64,
    },
    /// An agent reported a failure; the task went back to the queue.
    TaskFailed {
        task_id: TaskId,
        agent_id: AgentId,
        attempts: u32,
        errors: Vec<String>,
    },
    /// An active task was returned to the queue by the caller.
    TaskCancelled { task_id: TaskId, agent_id: AgentId },
    /// A pending task was taken out of the queue.
    TaskWithdrawn { task_id: TaskId },
    /// A withdrawn task re-entered the queue.
    TaskReinstated { task_id: TaskId },
    /// An agent reached a higher tier.
    TierAdvanced {
        agent_id: AgentId,
        from: Tier,
        to: Tier,
    },
}

impl SchedulerEvent {
    /// Task this event concerns, if any.
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            SchedulerEvent::TaskQueued { task_id }
            | SchedulerEvent::TaskAssigned { task_id, .. }
            | SchedulerEvent::TaskCompleted { task_id, .. }
            | SchedulerEvent::TaskFailed { task_id, .. }
            | SchedulerEvent::TaskCancelled { task_id, .. }
            | SchedulerEvent::TaskWithdrawn { task_id }
            | SchedulerEvent::TaskReinstated { task_id } => Some(task_id),
            SchedulerEvent::AgentRegistered { .. } | SchedulerEvent::TierAdvanced { .. } => None,
        }
    }
}
