//! Scheduler: the assignment engine and its surrounding operations.
//!
//! The `Scheduler` owns the agent registry and task store behind a single
//! read-write lock. Every mutating operation holds the write lock for its
//! whole body, so selecting a task and activating it is indivisible and two
//! callers can never receive the same task. Read-only queries share the
//! read lock and always observe a consistent view. Lifecycle events are
//! queued before the write lock is released, so the event stream follows
//! lock order even with many callers.
//!
//! Nothing here waits for work: when no task is eligible the caller gets
//! `Ok(None)` immediately and is expected to poll again later.

use crate::config::SchedulerConfig;
use crate::core::agent::{AgentId, AgentProfile, AgentStats};
use crate::core::prereq::{prerequisites_satisfied, PrerequisiteGraph};
use crate::core::task::{Task, TaskId, TaskResult};
use crate::engine::events::SchedulerEvent;
use crate::engine::learning::calculate_learning_value;
use crate::engine::registry::AgentRegistry;
use crate::engine::stats::SchedulerStats;
use crate::engine::store::{TaskRecord, TaskStore};
use crate::error::{Error, Result};
use crate::state::{SchedulerSnapshot, SNAPSHOT_VERSION};
use crate::{dlog, dlog_debug, dlog_trace, dlog_warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Registry and store, always locked together.
struct SchedulerState {
    registry: AgentRegistry,
    store: TaskStore,
}

impl SchedulerState {
    /// Check tier and prerequisites; ignores the concurrency cap.
    fn is_eligible(agent: &AgentProfile, task: &Task) -> bool {
        agent.meets_tier(task) && prerequisites_satisfied(task, &agent.completed_tasks)
    }
}

/// Thread-safe scheduling engine.
///
/// # Example
///
/// ```
/// use dojo::{Scheduler, SchedulerConfig, Task};
///
/// let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
/// scheduler.register_agent("a1");
/// scheduler.add_task(Task::new("t1", "Hello world")).unwrap();
///
/// let task = scheduler.get_next_task(&"a1".into()).unwrap();
/// assert_eq!(task.map(|t| t.id.to_string()), Some("t1".to_string()));
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    state: RwLock<SchedulerState>,
    event_tx: Option<mpsc::Sender<SchedulerEvent>>,
}

impl Scheduler {
    /// Create an empty scheduler.
    ///
    /// # Errors
    /// Returns `Validation` if the configuration is unusable.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let registry = AgentRegistry::new(config.max_concurrent_tasks);
        Ok(Self {
            config,
            state: RwLock::new(SchedulerState {
                registry,
                store: TaskStore::new(),
            }),
            event_tx: None,
        })
    }

    /// Emit lifecycle events on `event_tx`.
    ///
    /// Delivery uses `try_send` under the write lock: when the channel is
    /// full or closed the event is dropped rather than blocking the scheduler.
    pub fn with_events(mut self, event_tx: mpsc::Sender<SchedulerEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Rebuild a scheduler from a snapshot, under the config it recorded.
    ///
    /// # Errors
    /// Returns `Validation` if the recorded configuration is unusable, the
    /// snapshot version is unknown, or agents and tasks disagree about who
    /// holds which task.
    pub fn restore(snapshot: SchedulerSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Validation(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        let config = snapshot.config;
        config.validate()?;

        let registry = AgentRegistry::from_profiles(snapshot.agents, config.max_concurrent_tasks)?;
        let store = TaskStore::from_records(snapshot.tasks, snapshot.next_sequence)?;

        for record in store.records() {
            if let Some(owner) = record.state.owner() {
                let holds = registry
                    .get(owner)
                    .map(|agent| agent.active_tasks.contains(&record.task.id))
                    .unwrap_or(false);
                if !holds {
                    return Err(Error::Validation(format!(
                        "Task {} is active under {} but the agent does not hold it",
                        record.task.id, owner
                    )));
                }
            }
        }
        for agent in registry.profiles() {
            for task_id in &agent.active_tasks {
                let owned = store
                    .get(task_id)
                    .and_then(|record| record.state.owner())
                    .map(|owner| owner == &agent.id)
                    .unwrap_or(false);
                if !owned {
                    return Err(Error::Validation(format!(
                        "Agent {} holds {} which is not active under it",
                        agent.id, task_id
                    )));
                }
            }
        }

        dlog!(
            "Scheduler restored: {} agents, {} tasks",
            registry.len(),
            store.len()
        );
        Ok(Self {
            config,
            state: RwLock::new(SchedulerState { registry, store }),
            event_tx: None,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.try_send(event) {
                dlog_trace!("event dropped: {}", e);
            }
        }
    }

    // ========== Agent Registry ==========

    /// Register an agent with no skills. See [`Scheduler::register_agent_with_skills`].
    pub fn register_agent(&self, id: impl Into<AgentId>) -> bool {
        self.register_agent_with_skills(id, BTreeMap::<String, f64>::new())
    }

    /// Register an agent with starting skill proficiencies.
    ///
    /// Registering an id twice keeps the existing profile. Returns `true`
    /// if a new profile was created.
    pub fn register_agent_with_skills<K: Into<String>>(
        &self,
        id: impl Into<AgentId>,
        skills: impl IntoIterator<Item = (K, f64)>,
    ) -> bool {
        let id = id.into();
        let skills: BTreeMap<String, f64> = skills.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let mut state = self.state.write();
        let created = state.registry.register(id.clone(), skills);
        if created {
            dlog_debug!(agent = id; "registered");
            self.emit(SchedulerEvent::AgentRegistered { agent_id: id });
        } else {
            dlog_debug!(agent = id; "already registered, keeping profile");
        }
        drop(state);
        created
    }

    /// Snapshot of an agent's profile, or `None` if unknown.
    pub fn get_agent_stats(&self, id: &AgentId) -> Option<AgentStats> {
        self.state.read().registry.get(id).map(AgentProfile::stats)
    }

    /// Registered agent ids in sorted order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.state.read().registry.ids()
    }

    // ========== Task Store ==========

    /// Queue a new task.
    ///
    /// # Errors
    /// Returns `TaskAlreadyExists` if the id is taken.
    pub fn add_task(&self, task: Task) -> Result<()> {
        let task_id = task.id.clone();
        let mut state = self.state.write();
        let sequence = state.store.insert(task)?;
        dlog_debug!(task = task_id, sequence = sequence; "queued");
        self.emit(SchedulerEvent::TaskQueued { task_id });
        drop(state);
        Ok(())
    }

    /// A copy of a task record, or `None` if unknown.
    pub fn get_task(&self, id: &TaskId) -> Option<TaskRecord> {
        self.state.read().store.get(id).cloned()
    }

    /// Return an active task to the queue at its original position.
    ///
    /// Tasks in any other state, and unknown ids, are left alone. Returns
    /// `true` if a task was returned to the queue.
    pub fn cancel_task(&self, id: &TaskId) -> bool {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let Some(owner) = state.store.requeue(id) else {
            dlog_trace!(task = id; "cancel ignored: not active");
            return false;
        };
        if let Some(agent) = state.registry.get_mut(&owner) {
            agent.active_tasks.remove(id);
        }

        dlog_debug!(agent = owner, task = id; "cancelled, back in queue");
        self.emit(SchedulerEvent::TaskCancelled {
            task_id: id.clone(),
            agent_id: owner,
        });
        drop(guard);
        true
    }

    /// Take a pending task out of the queue without destroying it.
    pub fn withdraw_task(&self, id: &TaskId) -> bool {
        let mut state = self.state.write();
        let withdrawn = state.store.withdraw(id);
        if withdrawn {
            dlog_debug!(task = id; "withdrawn");
            self.emit(SchedulerEvent::TaskWithdrawn { task_id: id.clone() });
        }
        drop(state);
        withdrawn
    }

    /// Return a withdrawn task to the queue at its original position.
    pub fn reinstate_task(&self, id: &TaskId) -> bool {
        let mut state = self.state.write();
        let reinstated = state.store.reinstate(id);
        if reinstated {
            dlog_debug!(task = id; "reinstated");
            self.emit(SchedulerEvent::TaskReinstated { task_id: id.clone() });
        }
        drop(state);
        reinstated
    }

    // ========== Assignment ==========

    /// Hand the best eligible pending task to an agent.
    ///
    /// Returns `Ok(None)` when the agent is at its concurrency cap or no
    /// pending task passes the tier and prerequisite checks. Eligible tasks
    /// are taken by priority, highest first, then by insertion order.
    ///
    /// # Errors
    /// Returns `UnknownAgent` if the agent is not registered.
    pub fn get_next_task(&self, agent_id: &AgentId) -> Result<Option<Task>> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let agent = state.registry.require(agent_id)?;
        if !state.registry.has_capacity(agent) {
            dlog_trace!(agent = agent_id; "at capacity ({} active)", agent.active_tasks.len());
            return Ok(None);
        }

        let chosen = state
            .store
            .pending()
            .find(|record| SchedulerState::is_eligible(agent, &record.task))
            .map(|record| record.task.id.clone());
        let Some(task_id) = chosen else {
            dlog_trace!(agent = agent_id; "no eligible task");
            return Ok(None);
        };

        let task = state.store.activate(&task_id, agent_id)?;
        state
            .registry
            .require_mut(agent_id)?
            .active_tasks
            .insert(task_id.clone());

        dlog_debug!(agent = agent_id, task = task_id; "assigned");
        self.emit(SchedulerEvent::TaskAssigned {
            task_id,
            agent_id: agent_id.clone(),
        });
        drop(guard);
        Ok(Some(task))
    }

    // ========== Completion ==========

    /// Apply a reported outcome.
    ///
    /// On success the task is completed and the agent gains the task,
    /// experience and skill; its tier is re-evaluated when adaptive learning
    /// is enabled. On failure only the agent's failure count changes and the
    /// task returns to the queue at its original position.
    ///
    /// # Errors
    /// - `UnknownAgent` if the reporting agent is not registered
    /// - `InvalidCompletion` if the task is not active under that agent
    pub fn complete_task(&self, result: TaskResult) -> Result<()> {
        let mut guard = self.state.write();
        let SchedulerState { registry, store } = &mut *guard;

        let agent = registry.require_mut(&result.agent_id)?;
        let owned_by_agent = store
            .get(&result.task_id)
            .map(|record| record.state.owner() == Some(&result.agent_id))
            .unwrap_or(false);
        if !agent.active_tasks.contains(&result.task_id) || !owned_by_agent {
            return Err(Error::InvalidCompletion {
                task_id: result.task_id,
                agent_id: result.agent_id,
            });
        }

        agent.active_tasks.remove(&result.task_id);

        if result.success {
            store.complete(&result.task_id);
            if let Some(record) = store.get(&result.task_id) {
                agent.record_success(&record.task, result.quality, result.learning_gained);
            }
            dlog_debug!(
                agent = result.agent_id, task = result.task_id;
                "completed (+{} xp)", result.learning_gained
            );
            self.emit(SchedulerEvent::TaskCompleted {
                task_id: result.task_id,
                agent_id: result.agent_id,
                learning_gained: result.learning_gained,
            });
            if self.config.enable_adaptive_learning {
                let before = agent.tier;
                if let Some(tier) = agent.advance_tier(self.config.learning_threshold) {
                    dlog!(agent = agent.id; "advanced from {} to {}", before, tier);
                    self.emit(SchedulerEvent::TierAdvanced {
                        agent_id: agent.id.clone(),
                        from: before,
                        to: tier,
                    });
                }
            }
        } else {
            agent.record_failure();
            let attempts = store.fail(&result.task_id).unwrap_or_default();
            dlog_warn!(
                agent = result.agent_id, task = result.task_id, attempt = attempts;
                "failed: {:?}", result.errors
            );
            self.emit(SchedulerEvent::TaskFailed {
                task_id: result.task_id,
                agent_id: result.agent_id,
                attempts,
                errors: result.errors,
            });
        }
        drop(guard);
        Ok(())
    }

    // ========== Learning value & recommendations ==========

    /// Score a task for an agent using the configured weights.
    pub fn calculate_learning_value(&self, task: &Task, agent: &AgentStats) -> f64 {
        calculate_learning_value(task, agent, &self.config.learning_weights)
    }

    /// Rank the pending tasks an agent is eligible for by learning value.
    ///
    /// Uses the same tier and prerequisite checks as assignment but ignores
    /// the concurrency cap. Ties keep assignment order. Never mutates state.
    ///
    /// # Errors
    /// Returns `UnknownAgent` if the agent is not registered.
    pub fn get_recommended_tasks(&self, agent_id: &AgentId, limit: usize) -> Result<Vec<Task>> {
        let state = self.state.read();
        let agent = state.registry.require(agent_id)?;
        let stats = agent.stats();

        let mut scored: Vec<(f64, &TaskRecord)> = state
            .store
            .pending()
            .filter(|record| SchedulerState::is_eligible(agent, &record.task))
            .map(|record| (self.calculate_learning_value(&record.task, &stats), record))
            .collect();
        // Equal scores fall back to assignment order.
        scored.sort_by(|(value_a, a), (value_b, b)| {
            value_b
                .total_cmp(value_a)
                .then_with(|| b.task.priority.cmp(&a.task.priority))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, record)| record.task.clone())
            .collect())
    }

    // ========== Prerequisite graph ==========

    /// Tasks the agent still has to finish, in dependency order, before
    /// `target` becomes eligible; ends with `target`.
    ///
    /// # Errors
    /// - `UnknownAgent` if the agent is not registered
    /// - `TaskNotFound` if `target` was never added
    /// - `Validation` if the prerequisites form a cycle
    pub fn learning_path(&self, agent_id: &AgentId, target: &TaskId) -> Result<Vec<TaskId>> {
        let state = self.state.read();
        let agent = state.registry.require(agent_id)?;
        let graph = PrerequisiteGraph::build(state.store.records().into_iter().map(|r| &r.task));
        graph.learning_path(target, &agent.completed_tasks)
    }

    /// Prerequisite ids that no stored task carries.
    pub fn unknown_prerequisites(&self) -> Vec<TaskId> {
        let state = self.state.read();
        PrerequisiteGraph::build(state.store.records().into_iter().map(|r| &r.task))
            .unknown_prerequisites()
    }

    /// True if some stored tasks require each other in a loop. Such tasks
    /// can never become eligible.
    pub fn has_prerequisite_cycle(&self) -> bool {
        let state = self.state.read();
        PrerequisiteGraph::build(state.store.records().into_iter().map(|r| &r.task)).has_cycle()
    }

    // ========== Statistics ==========

    pub fn get_stats(&self) -> SchedulerStats {
        let state = self.state.read();
        SchedulerStats::collect(&state.store, &state.registry)
    }

    /// Check whether no work can ever reach this agent without outside help.
    ///
    /// True when the agent holds nothing, nothing pending is eligible for
    /// it, and no task is active anywhere (so no failure or cancellation can
    /// put work back in the queue).
    ///
    /// # Errors
    /// Returns `UnknownAgent` if the agent is not registered.
    pub fn is_idle_for(&self, agent_id: &AgentId) -> Result<bool> {
        let state = self.state.read();
        let agent = state.registry.require(agent_id)?;
        if !agent.active_tasks.is_empty() || state.store.counts().active > 0 {
            return Ok(false);
        }
        let has_eligible = state
            .store
            .pending()
            .any(|record| SchedulerState::is_eligible(agent, &record.task));
        Ok(!has_eligible)
    }

    // ========== Snapshots ==========

    /// Copy the full scheduler state.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.state.read();
        SchedulerSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            agents: state.registry.profiles().into_iter().cloned().collect(),
            tasks: state.store.records().into_iter().cloned().collect(),
            next_sequence: state.store.next_sequence(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Scheduler")
            .field("agents", &state.registry.len())
            .field("tasks", &state.store.len())
            .field("max_concurrent_tasks", &self.config.max_concurrent_tasks)
            .finish()
    }
}
