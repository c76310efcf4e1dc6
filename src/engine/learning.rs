//! Learning value scoring.
//!
//! Estimates how much growth a task offers a particular agent: the task's
//! base value, plus a bonus per required skill the agent has never
//! practised, plus a bonus proportional to the estimated effort.

use crate::config::LearningWeights;
use crate::core::agent::AgentStats;
use crate::core::task::Task;

/// Number of the task's required skills absent from the agent's profile.
pub fn unfamiliar_skills(task: &Task, agent: &AgentStats) -> usize {
    task.required_skills
        .iter()
        .filter(|skill| !agent.knows(skill))
        .count()
}

/// Score a task for an agent.
pub fn calculate_learning_value(task: &Task, agent: &AgentStats, weights: &LearningWeights) -> f64 {
    let unfamiliar_bonus = weights.unfamiliar_skill_bonus * unfamiliar_skills(task, agent) as f64;
    let difficulty_bonus = weights.difficulty_per_minute * f64::from(task.estimated_time);
    task.base_learning_value + unfamiliar_bonus + difficulty_bonus
}
