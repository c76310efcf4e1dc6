//! Agent capability profiles.
//!
//! An agent's profile tracks its skills, tier, experience and the tasks it
//! holds or has finished. Profiles are owned by the registry and only
//! changed by assignment, completion and cancellation; callers see
//! [`AgentStats`] snapshots.

use crate::core::task::{Task, TaskId, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Highest proficiency a skill can reach.
pub const MAX_PROFICIENCY: f64 = 100.0;

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable capability state of a registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    /// Skill name to proficiency (0-100).
    pub skills: BTreeMap<String, f64>,
    pub tier: Tier,
    pub total_experience: f64,
    pub completed_tasks: BTreeSet<TaskId>,
    pub active_tasks: BTreeSet<TaskId>,
    pub success_count: u64,
    pub failure_count: u64,
}

impl AgentProfile {
    /// Create a beginner profile with the given starting skills.
    ///
    /// Proficiencies outside 0-100 are clamped.
    pub fn new(id: AgentId, initial_skills: BTreeMap<String, f64>) -> Self {
        let skills = initial_skills
            .into_iter()
            .map(|(name, level)| (name, level.clamp(0.0, MAX_PROFICIENCY)))
            .collect();
        Self {
            id,
            skills,
            tier: Tier::Beginner,
            total_experience: 0.0,
            completed_tasks: BTreeSet::new(),
            active_tasks: BTreeSet::new(),
            success_count: 0,
            failure_count: 0,
        }
    }

    /// Check whether the agent's tier allows the task.
    pub fn meets_tier(&self, task: &Task) -> bool {
        task.tier <= self.tier
    }

    /// Apply a successful outcome: record the task, gain experience and
    /// raise every skill the task exercised by `quality / 10`.
    pub fn record_success(&mut self, task: &Task, quality: u8, learning_gained: f64) {
        self.completed_tasks.insert(task.id.clone());
        self.total_experience += learning_gained.max(0.0);
        self.success_count += 1;

        let gain = f64::from(quality.min(100)) / 10.0;
        for skill in &task.required_skills {
            let level = self.skills.entry(skill.clone()).or_insert(0.0);
            *level = (*level + gain).min(MAX_PROFICIENCY);
        }
    }

    /// Apply a failed outcome. Only the failure counter moves.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Re-evaluate the tier from accumulated experience.
    ///
    /// The tier never decreases. Returns the new tier when it advanced.
    pub fn advance_tier(&mut self, threshold: f64) -> Option<Tier> {
        let earned = Tier::for_experience(self.total_experience, threshold);
        if earned > self.tier {
            self.tier = earned;
            Some(earned)
        } else {
            None
        }
    }

    /// Fraction of reported outcomes that succeeded; 0 before any outcome.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            id: self.id.clone(),
            skills: self.skills.clone(),
            tier: self.tier,
            total_experience: self.total_experience,
            completed_tasks: self.completed_tasks.clone(),
            active_tasks: self.active_tasks.clone(),
            success_count: self.success_count,
            failure_count: self.failure_count,
            success_rate: self.success_rate(),
        }
    }
}

/// Immutable snapshot of an agent profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub id: AgentId,
    pub skills: BTreeMap<String, f64>,
    pub tier: Tier,
    pub total_experience: f64,
    pub completed_tasks: BTreeSet<TaskId>,
    pub active_tasks: BTreeSet<TaskId>,
    pub success_count: u64,
    pub failure_count: u64,
    pub success_rate: f64,
}

impl AgentStats {
    /// Check whether the agent has any proficiency entry for a skill.
    pub fn knows(&self, skill: &str) -> bool {
        self.skills.contains_key(skill)
    }
}
