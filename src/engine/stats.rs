//! Aggregate statistics over the task store and agent registry.

use crate::core::task::Tier;
use crate::engine::registry::AgentRegistry;
use crate::engine::store::TaskStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts computed from current scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_tasks: usize,
    pub queued_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub cancelled_tasks: usize,
    pub total_agents: usize,
    /// Failed outcomes reported across all tasks.
    pub failed_attempts: u64,
    /// Number of agents at each tier.
    pub tier_distribution: BTreeMap<Tier, usize>,
}

impl SchedulerStats {
    pub fn collect(store: &TaskStore, registry: &AgentRegistry) -> Self {
        let counts = store.counts();
        let mut tier_distribution: BTreeMap<Tier, usize> =
            Tier::ALL.iter().map(|tier| (*tier, 0)).collect();
        for profile in registry.profiles() {
            *tier_distribution.entry(profile.tier).or_insert(0) += 1;
        }

        Self {
            total_tasks: store.len(),
            queued_tasks: counts.pending,
            active_tasks: counts.active,
            completed_tasks: counts.completed,
            cancelled_tasks: counts.cancelled,
            total_agents: registry.len(),
            failed_attempts: store.failed_attempts(),
            tier_distribution,
        }
    }

    /// True when nothing is queued or running.
    pub fn is_drained(&self) -> bool {
        self.queued_tasks == 0 && self.active_tasks == 0
    }
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tasks={} queued={} active={} completed={} cancelled={} agents={} failed_attempts={}",
            self.total_tasks,
            self.queued_tasks,
            self.active_tasks,
            self.completed_tasks,
            self.cancelled_tasks,
            self.total_agents,
            self.failed_attempts
        )
    }
}
