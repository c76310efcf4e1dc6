//! Core domain models for the dojo scheduling engine.
//!
//! This module contains the fundamental data structures: tasks, agent
//! profiles, and prerequisite resolution.

pub mod agent;
pub mod prereq;
pub mod task;

pub use agent::{AgentId, AgentProfile, AgentStats};
pub use prereq::{prerequisites_satisfied, PrerequisiteGraph};
pub use task::{Priority, Task, TaskCategory, TaskId, TaskResult, TaskState, Tier};
