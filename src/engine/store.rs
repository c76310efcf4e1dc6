//! Task store.
//!
//! Owns every task and its lifecycle state. Pending tasks are additionally
//! indexed by [`QueueKey`] so iteration yields them in assignment order:
//! priority descending, then insertion sequence ascending. The order comes
//! from the key's `Ord`, never from sort stability.

use crate::core::agent::AgentId;
use crate::core::task::{Priority, Task, TaskId, TaskState};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// A task together with its scheduling metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: Task,
    /// Insertion order, used only to break priority ties.
    pub sequence: u64,
    pub state: TaskState,
    /// Failed outcomes reported for this task so far.
    #[serde(default)]
    pub failed_attempts: u32,
}

impl TaskRecord {
    pub fn is_pending(&self) -> bool {
        self.state == TaskState::Pending
    }

    fn queue_key(&self) -> QueueKey {
        QueueKey {
            priority: self.task.priority,
            sequence: self.sequence,
        }
    }
}

/// Position of a pending task in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueKey {
    priority: Priority,
    sequence: u64,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            // earlier insertion wins for the same priority
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-state task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Owns all tasks and the pending queue.
#[derive(Debug, Default)]
pub struct TaskStore {
    records: HashMap<TaskId, TaskRecord>,
    queue: BTreeMap<QueueKey, TaskId>,
    next_sequence: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted records.
    ///
    /// # Errors
    /// Returns `Validation` on duplicate ids, duplicate sequence numbers, or
    /// a sequence number not below `next_sequence`.
    pub fn from_records(records: Vec<TaskRecord>, next_sequence: u64) -> Result<Self> {
        let mut store = Self {
            records: HashMap::with_capacity(records.len()),
            queue: BTreeMap::new(),
            next_sequence,
        };
        let mut sequences = std::collections::HashSet::new();

        for record in records {
            if record.sequence >= next_sequence {
                return Err(Error::Validation(format!(
                    "Task {} has sequence {} beyond next sequence {}",
                    record.task.id, record.sequence, next_sequence
                )));
            }
            if !sequences.insert(record.sequence) {
                return Err(Error::Validation(format!(
                    "Duplicate sequence number {}",
                    record.sequence
                )));
            }
            if store.records.contains_key(&record.task.id) {
                return Err(Error::Validation(format!(
                    "Duplicate task id {}",
                    record.task.id
                )));
            }
            if record.state == TaskState::Pending {
                store.queue.insert(record.queue_key(), record.task.id.clone());
            }
            store.records.insert(record.task.id.clone(), record);
        }
        Ok(store)
    }

    /// Insert a new task as pending and return its sequence number.
    ///
    /// # Errors
    /// Returns `TaskAlreadyExists` if a task with the same id is stored.
    pub fn insert(&mut self, task: Task) -> Result<u64> {
        if self.records.contains_key(&task.id) {
            return Err(Error::TaskAlreadyExists { id: task.id });
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let record = TaskRecord {
            task,
            sequence,
            state: TaskState::Pending,
            failed_attempts: 0,
        };
        self.queue.insert(record.queue_key(), record.task.id.clone());
        self.records.insert(record.task.id.clone(), record);
        Ok(sequence)
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<&TaskRecord> {
        let mut records: Vec<&TaskRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.sequence);
        records
    }

    /// Pending records in assignment order.
    pub fn pending(&self) -> impl Iterator<Item = &TaskRecord> {
        self.queue.values().filter_map(|id| self.records.get(id))
    }

    /// Move a pending task to active under `agent_id` and return a copy of it.
    ///
    /// # Errors
    /// - `TaskNotFound` if the id is unknown
    /// - `Validation` if the task is not pending
    pub fn activate(&mut self, id: &TaskId, agent_id: &AgentId) -> Result<Task> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| Error::TaskNotFound { id: id.clone() })?;
        if record.state != TaskState::Pending {
            return Err(Error::Validation(format!(
                "Task {} cannot be assigned while {}",
                id, record.state
            )));
        }
        self.queue.remove(&record.queue_key());
        record.state = TaskState::Active {
            agent_id: agent_id.clone(),
        };
        Ok(record.task.clone())
    }

    /// Return an active task to the queue at its original position.
    ///
    /// Returns the agent that held it, or `None` if the task was not active.
    pub fn requeue(&mut self, id: &TaskId) -> Option<AgentId> {
        let record = self.records.get_mut(id)?;
        let TaskState::Active { agent_id } = &record.state else {
            return None;
        };
        let owner = agent_id.clone();
        record.state = TaskState::Pending;
        self.queue.insert(record.queue_key(), id.clone());
        Some(owner)
    }

    /// Record a failed outcome for an active task and requeue it.
    ///
    /// Returns the updated attempt count, or `None` if the task was not active.
    pub fn fail(&mut self, id: &TaskId) -> Option<u32> {
        self.requeue(id)?;
        let record = self.records.get_mut(id)?;
        record.failed_attempts += 1;
        Some(record.failed_attempts)
    }

    /// Mark an active task completed by its owner.
    pub fn complete(&mut self, id: &TaskId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        let TaskState::Active { agent_id } = &record.state else {
            return false;
        };
        record.state = TaskState::Completed {
            agent_id: agent_id.clone(),
        };
        true
    }

    /// Take a pending task out of the queue.
    pub fn withdraw(&mut self, id: &TaskId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if record.state != TaskState::Pending {
            return false;
        }
        self.queue.remove(&record.queue_key());
        record.state = TaskState::Cancelled;
        true
    }

    /// Put a cancelled task back in the queue at its original position.
    pub fn reinstate(&mut self, id: &TaskId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if record.state != TaskState::Cancelled {
            return false;
        }
        record.state = TaskState::Pending;
        self.queue.insert(record.queue_key(), id.clone());
        true
    }

    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for record in self.records.values() {
            match record.state {
                TaskState::Pending => counts.pending += 1,
                TaskState::Active { .. } => counts.active += 1,
                TaskState::Completed { .. } => counts.completed += 1,
                TaskState::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// Sum of failed attempts across all tasks.
    pub fn failed_attempts(&self) -> u64 {
        self.records
            .values()
            .map(|r| u64::from(r.failed_attempts))
            .sum()
    }
}
