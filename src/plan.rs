//! Plan files: a TOML description of agents and tasks to load into a
//! scheduler.
//!
//! ```toml
//! [[agents]]
//! id = "alice"
//! skills = { javascript = 60.0, api = 50.0 }
//!
//! [[tasks]]
//! id = "build-api"
//! title = "Build REST API"
//! tier = "beginner"
//! priority = "high"
//! estimated_time = 45
//! required_skills = ["javascript", "api"]
//! prerequisites = []
//! ```

use crate::config::SchedulerConfig;
use crate::core::agent::AgentId;
use crate::core::task::Task;
use crate::engine::scheduler::Scheduler;
use crate::{dlog_debug, dlog_warn, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// An agent entry in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: AgentId,
    #[serde(default)]
    pub skills: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn load(path: &Path) -> Result<Self> {
        dlog_debug!("Plan::load path={}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let plan: Plan = toml::from_str(contents)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reject duplicate ids and out-of-range skill levels.
    pub fn validate(&self) -> Result<()> {
        let mut agents = HashSet::new();
        for agent in &self.agents {
            if !agents.insert(&agent.id) {
                return Err(Error::Validation(format!(
                    "Duplicate agent id in plan: {}",
                    agent.id
                )));
            }
            if let Some((skill, level)) = agent
                .skills
                .iter()
                .find(|(_, level)| !(0.0..=100.0).contains(*level))
            {
                return Err(Error::Validation(format!(
                    "Skill {} of agent {} must be within 0-100, got {}",
                    skill, agent.id, level
                )));
            }
        }

        let mut tasks = HashSet::new();
        for task in &self.tasks {
            if !tasks.insert(&task.id) {
                return Err(Error::Validation(format!(
                    "Duplicate task id in plan: {}",
                    task.id
                )));
            }
        }
        Ok(())
    }

    /// Register every agent and queue every task, in file order.
    pub fn apply(&self, scheduler: &Scheduler) -> Result<()> {
        for agent in &self.agents {
            scheduler.register_agent_with_skills(agent.id.clone(), agent.skills.clone());
        }
        for task in &self.tasks {
            scheduler.add_task(task.clone())?;
        }

        let unknown = scheduler.unknown_prerequisites();
        if !unknown.is_empty() {
            dlog_warn!(
                "Plan references unknown prerequisites, dependent tasks will never run: {:?}",
                unknown
            );
        }
        if scheduler.has_prerequisite_cycle() {
            dlog_warn!("Plan has a prerequisite cycle, the tasks in it will never run");
        }
        Ok(())
    }

    /// Build a fresh scheduler holding this plan.
    pub fn into_scheduler(self, config: SchedulerConfig) -> Result<Scheduler> {
        let scheduler = Scheduler::new(config)?;
        self.apply(&scheduler)?;
        Ok(scheduler)
    }
}
