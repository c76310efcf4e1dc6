//! Prerequisite resolution.
//!
//! The resolver itself is a subset check against an agent's completed set.
//! [`PrerequisiteGraph`] builds the whole prerequisite relation as a
//! directed graph so callers can ask for the ordered path of tasks an agent
//! still has to finish before a target becomes eligible.

use crate::core::task::{Task, TaskId};
use crate::error::{Error, Result};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::NodeFiltered;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Check that every prerequisite of `task` is in `completed`.
pub fn prerequisites_satisfied(task: &Task, completed: &BTreeSet<TaskId>) -> bool {
    task.prerequisites.iter().all(|id| completed.contains(id))
}

/// Directed graph of prerequisite relations.
///
/// An edge `a -> b` means `a` must be completed before `b`. Ids referenced
/// as prerequisites but never added as tasks still get a node so they show
/// up in paths and in [`PrerequisiteGraph::unknown_prerequisites`].
pub struct PrerequisiteGraph {
    graph: DiGraph<TaskId, ()>,
    index: HashMap<TaskId, NodeIndex>,
    known: HashSet<TaskId>,
}

impl PrerequisiteGraph {
    /// Build the graph from a set of tasks.
    pub fn build<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut this = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            known: HashSet::new(),
        };

        let tasks: Vec<&Task> = tasks.into_iter().collect();
        for task in &tasks {
            this.node(&task.id);
            this.known.insert(task.id.clone());
        }
        for task in &tasks {
            let to = this.node(&task.id);
            for prereq in &task.prerequisites {
                let from = this.node(prereq);
                if this.graph.find_edge(from, to).is_none() {
                    this.graph.add_edge(from, to, ());
                }
            }
        }
        this
    }

    fn node(&mut self, id: &TaskId) -> NodeIndex {
        if let Some(&index) = self.index.get(id) {
            return index;
        }
        let index = self.graph.add_node(id.clone());
        self.index.insert(id.clone(), index);
        index
    }

    /// Number of prerequisite edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.known.contains(id)
    }

    /// Ids referenced as prerequisites that no task in the graph carries.
    pub fn unknown_prerequisites(&self) -> Vec<TaskId> {
        let mut unknown: Vec<TaskId> = self
            .index
            .keys()
            .filter(|id| !self.known.contains(*id))
            .cloned()
            .collect();
        unknown.sort();
        unknown
    }

    /// True if any tasks require each other in a loop.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Tasks to finish, in dependency order, before `target` can be taken,
    /// ending with `target` itself.
    ///
    /// Prerequisites already in `completed` are not expanded further. Only
    /// the unfinished closure of `target` is sorted, so cycles elsewhere in
    /// the graph do not matter.
    ///
    /// # Errors
    /// - `TaskNotFound` if `target` is not a task in the graph
    /// - `Validation` if the prerequisites of `target` form a cycle
    pub fn learning_path(
        &self,
        target: &TaskId,
        completed: &BTreeSet<TaskId>,
    ) -> Result<Vec<TaskId>> {
        if !self.contains(target) {
            return Err(Error::TaskNotFound { id: target.clone() });
        }
        let target_index = self.index[target];

        // Walk prerequisites backwards from the target.
        let mut needed: HashSet<NodeIndex> = HashSet::new();
        let mut stack = vec![target_index];
        while let Some(index) = stack.pop() {
            if !needed.insert(index) {
                continue;
            }
            for prereq in self.graph.neighbors_directed(index, Direction::Incoming) {
                let done = self
                    .graph
                    .node_weight(prereq)
                    .map(|id| completed.contains(id))
                    .unwrap_or(false);
                if !done {
                    stack.push(prereq);
                }
            }
        }

        let closure = NodeFiltered::from_fn(&self.graph, |index| needed.contains(&index));
        let sorted = toposort(&closure, None).map_err(|cycle| {
            let id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Error::Validation(format!("Prerequisite cycle detected at task: {}", id))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index).cloned())
            .collect())
    }
}

impl std::fmt::Debug for PrerequisiteGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrerequisiteGraph")
            .field("tasks", &self.known.len())
            .field("edges", &self.edge_count())
            .finish()
    }
}
