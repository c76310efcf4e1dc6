//! Task execution contract.
//!
//! The scheduler never runs work itself. A [`TaskExecutor`] receives an
//! assigned task plus the agent's profile at assignment time and reports a
//! [`TaskResult`]. Executors run on the blocking pool, so implementations may
//! block freely.

use crate::config::LearningWeights;
use crate::core::agent::AgentStats;
use crate::core::task::{Task, TaskId, TaskResult};
use crate::engine::learning::calculate_learning_value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Runs assigned tasks and reports their outcome.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: &Task, agent: &AgentStats) -> TaskResult;
}

/// Deterministic executor for dry runs and tests.
///
/// Quality follows the agent's proficiency in the task's required skills
/// (tasks with no required skills score 80), learning gained is the task's
/// learning value for the agent scaled by quality, and the completion time
/// is the task's estimate. Tasks registered with [`SimulatedExecutor::failing`]
/// fail that many times before succeeding.
#[derive(Debug, Default)]
pub struct SimulatedExecutor {
    weights: LearningWeights,
    failures_remaining: Mutex<HashMap<TaskId, u32>>,
    delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(weights: LearningWeights) -> Self {
        Self {
            weights,
            ..Default::default()
        }
    }

    /// Make `task_id` fail its next `times` executions.
    pub fn failing(self, task_id: impl Into<TaskId>, times: u32) -> Self {
        self.failures_remaining.lock().insert(task_id.into(), times);
        self
    }

    /// Sleep this long inside every execution.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn take_failure(&self, task_id: &TaskId) -> bool {
        let mut remaining = self.failures_remaining.lock();
        match remaining.get_mut(task_id) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    fn quality_for(task: &Task, agent: &AgentStats) -> u8 {
        if task.required_skills.is_empty() {
            return 80;
        }
        let total: f64 = task
            .required_skills
            .iter()
            .map(|skill| agent.skills.get(skill).copied().unwrap_or(0.0))
            .sum();
        let average = total / task.required_skills.len() as f64;
        // 40 for a complete novice, 100 for a master
        (40.0 + average * 0.6).round().clamp(0.0, 100.0) as u8
    }
}

impl TaskExecutor for SimulatedExecutor {
    fn execute(&self, task: &Task, agent: &AgentStats) -> TaskResult {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        if self.take_failure(&task.id) {
            return TaskResult::failure(task.id.clone(), agent.id.clone(), "simulated failure")
                .with_completion_time(task.estimated_time);
        }

        let quality = Self::quality_for(task, agent);
        let learning = calculate_learning_value(task, agent, &self.weights) * f64::from(quality)
            / 100.0;
        TaskResult::success(task.id.clone(), agent.id.clone(), quality, learning)
            .with_completion_time(task.estimated_time)
    }
}
