//! Agent registry.
//!
//! The `AgentRegistry` owns every agent profile and enforces the per-agent
//! concurrency cap. Agents are never removed once registered.

use crate::core::agent::{AgentId, AgentProfile};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Owns agent profiles keyed by id.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, AgentProfile>,
    /// Maximum number of tasks a single agent may hold.
    max_concurrent: usize,
}

impl AgentRegistry {
    /// Create an empty registry with the given per-agent cap.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            agents: HashMap::new(),
            max_concurrent,
        }
    }

    /// Rebuild a registry from persisted profiles.
    ///
    /// # Errors
    /// Returns `Validation` on duplicate ids or a profile holding more tasks
    /// than the cap allows.
    pub fn from_profiles(profiles: Vec<AgentProfile>, max_concurrent: usize) -> Result<Self> {
        let mut registry = Self::new(max_concurrent);
        for profile in profiles {
            if profile.active_tasks.len() > max_concurrent {
                return Err(Error::Validation(format!(
                    "Agent {} holds {} tasks, cap is {}",
                    profile.id,
                    profile.active_tasks.len(),
                    max_concurrent
                )));
            }
            if registry.agents.contains_key(&profile.id) {
                return Err(Error::Validation(format!(
                    "Duplicate agent id {}",
                    profile.id
                )));
            }
            registry.agents.insert(profile.id.clone(), profile);
        }
        Ok(registry)
    }

    /// Register an agent. Existing profiles are left untouched.
    ///
    /// Returns `true` if a new profile was created.
    pub fn register(&mut self, id: AgentId, initial_skills: BTreeMap<String, f64>) -> bool {
        if self.agents.contains_key(&id) {
            return false;
        }
        self.agents
            .insert(id.clone(), AgentProfile::new(id, initial_skills));
        true
    }

    pub fn get(&self, id: &AgentId) -> Option<&AgentProfile> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: &AgentId) -> Option<&mut AgentProfile> {
        self.agents.get_mut(id)
    }

    /// Look up an agent, failing with `UnknownAgent`.
    pub fn require(&self, id: &AgentId) -> Result<&AgentProfile> {
        self.agents
            .get(id)
            .ok_or_else(|| Error::UnknownAgent { id: id.clone() })
    }

    /// Mutable lookup, failing with `UnknownAgent`.
    pub fn require_mut(&mut self, id: &AgentId) -> Result<&mut AgentProfile> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| Error::UnknownAgent { id: id.clone() })
    }

    /// Check if the agent can take another task.
    pub fn has_capacity(&self, profile: &AgentProfile) -> bool {
        profile.active_tasks.len() < self.max_concurrent
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Profiles in id order.
    pub fn profiles(&self) -> Vec<&AgentProfile> {
        let mut profiles: Vec<&AgentProfile> = self.agents.values().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}
