//! Task data model for the scheduling engine.
//!
//! Tasks are the units of work handed to agents. Each task carries its
//! eligibility constraints (tier, prerequisites, required skills) and a
//! priority; the store wraps them with lifecycle state.

use crate::core::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a task.
///
/// Callers usually supply their own ids; [`TaskId::generate`] produces a
/// UUID v4 based id when they do not care.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new task identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new unique task identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordinal capability rank of an agent, also the minimum rank a task requires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 4] = [
        Tier::Beginner,
        Tier::Intermediate,
        Tier::Advanced,
        Tier::Expert,
    ];

    /// Tier earned by a given amount of experience.
    ///
    /// Each tier spans one `threshold` worth of experience; anything at or
    /// above three thresholds is Expert.
    pub fn for_experience(experience: f64, threshold: f64) -> Self {
        if experience < threshold {
            Tier::Beginner
        } else if experience < 2.0 * threshold {
            Tier::Intermediate
        } else if experience < 3.0 * threshold {
            Tier::Advanced
        } else {
            Tier::Expert
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Beginner => write!(f, "beginner"),
            Tier::Intermediate => write!(f, "intermediate"),
            Tier::Advanced => write!(f, "advanced"),
            Tier::Expert => write!(f, "expert"),
        }
    }
}

/// Scheduling priority. Higher priorities are assigned first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    #[default]
    Coding,
    Debugging,
    Testing,
    Documentation,
    Design,
    Research,
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskCategory::Coding => write!(f, "coding"),
            TaskCategory::Debugging => write!(f, "debugging"),
            TaskCategory::Testing => write!(f, "testing"),
            TaskCategory::Documentation => write!(f, "documentation"),
            TaskCategory::Design => write!(f, "design"),
            TaskCategory::Research => write!(f, "research"),
        }
    }
}

fn default_estimated_time() -> u32 {
    30
}

fn default_base_learning_value() -> f64 {
    10.0
}

/// A unit of work with eligibility constraints and a priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    #[serde(default)]
    pub category: TaskCategory,
    /// Minimum agent tier required to receive this task.
    #[serde(default)]
    pub tier: Tier,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Estimated effort in minutes.
    #[serde(default = "default_estimated_time")]
    pub estimated_time: u32,
    #[serde(default = "default_base_learning_value")]
    pub base_learning_value: f64,
    /// Tasks an agent must have completed before receiving this one.
    #[serde(default)]
    pub prerequisites: Vec<TaskId>,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Create a task with the given id and title and default constraints:
    /// coding, beginner tier, normal priority, no prerequisites or skills.
    pub fn new(id: impl Into<TaskId>, title: &str) -> Self {
        Self {
            id: id.into(),
            category: TaskCategory::default(),
            tier: Tier::default(),
            title: title.to_string(),
            description: String::new(),
            estimated_time: default_estimated_time(),
            base_learning_value: default_base_learning_value(),
            prerequisites: Vec::new(),
            required_skills: BTreeSet::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_estimated_time(mut self, minutes: u32) -> Self {
        self.estimated_time = minutes;
        self
    }

    pub fn with_base_learning_value(mut self, value: f64) -> Self {
        self.base_learning_value = value;
        self
    }

    /// Append a prerequisite task id.
    pub fn requires(mut self, prerequisite: impl Into<TaskId>) -> Self {
        self.prerequisites.push(prerequisite.into());
        self
    }

    /// Add a required skill.
    pub fn with_skill(mut self, skill: &str) -> Self {
        self.required_skills.insert(skill.to_string());
        self
    }
}

/// Lifecycle state of a task inside the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskState {
    /// Queued and waiting for an eligible agent.
    #[default]
    Pending,
    /// Held by an agent.
    Active { agent_id: AgentId },
    /// Finished successfully by an agent.
    Completed { agent_id: AgentId },
    /// Withdrawn from the queue; can be reinstated.
    Cancelled,
}

impl TaskState {
    /// Agent currently holding the task, if active.
    pub fn owner(&self) -> Option<&AgentId> {
        match self {
            TaskState::Active { agent_id } => Some(agent_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Active { agent_id } => write!(f, "active: {}", agent_id),
            TaskState::Completed { agent_id } => write!(f, "completed: {}", agent_id),
            TaskState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a task reported by an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub success: bool,
    /// Actual time spent, in minutes.
    pub completion_time: u32,
    /// Quality score, 0-100. Larger values are clamped to 100.
    pub quality: u8,
    pub learning_gained: f64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl TaskResult {
    /// A successful outcome.
    pub fn success(
        task_id: impl Into<TaskId>,
        agent_id: impl Into<AgentId>,
        quality: u8,
        learning_gained: f64,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            success: true,
            completion_time: 0,
            quality,
            learning_gained,
            errors: Vec::new(),
        }
    }

    /// A failed outcome carrying the reported error.
    pub fn failure(task_id: impl Into<TaskId>, agent_id: impl Into<AgentId>, error: &str) -> Self {
        Self {
            task_id: task_id.into(),
            agent_id: agent_id.into(),
            success: false,
            completion_time: 0,
            quality: 0,
            learning_gained: 0.0,
            errors: vec![error.to_string()],
        }
    }

    pub fn with_completion_time(mut self, minutes: u32) -> Self {
        self.completion_time = minutes;
        self
    }
}
