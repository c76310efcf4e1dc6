//! Host dispatch loop.
//!
//! The [`Dispatcher`] drives a [`Scheduler`] to completion: one tokio worker
//! per registered agent repeatedly asks for the next task, runs it through
//! the [`TaskExecutor`] on the blocking pool, and reports the outcome. A
//! worker sleeps for `poll_interval` when nothing is eligible and stops once
//! [`Scheduler::is_idle_for`] says no more work can reach its agent.
//!
//! Tasks that keep failing are withdrawn after `max_task_attempts` failed
//! outcomes so the run always terminates.

use crate::config::DispatchConfig;
use crate::core::agent::AgentId;
use crate::core::task::{Task, TaskId, TaskResult};
use crate::engine::scheduler::Scheduler;
use crate::engine::stats::SchedulerStats;
use crate::error::{Error, Result};
use crate::orchestration::executor::TaskExecutor;
use crate::util::{blocking_with_timeout, elapsed_minutes};
use crate::{dlog, dlog_debug, dlog_trace, dlog_warn};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// A successful completion observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub quality: u8,
    pub learning_gained: f64,
}

/// A failed outcome observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub errors: Vec<String>,
}

/// Everything that happened during [`Dispatcher::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub completed: Vec<CompletedTask>,
    pub failures: Vec<FailedAttempt>,
    /// Tasks withdrawn after exhausting their attempts.
    pub withdrawn: Vec<TaskId>,
    /// Scheduler statistics once every worker stopped.
    pub stats: SchedulerStats,
}

impl RunSummary {
    fn merge(&mut self, report: WorkerReport) {
        self.completed.extend(report.completed);
        self.failures.extend(report.failures);
        self.withdrawn.extend(report.withdrawn);
    }
}

#[derive(Debug, Default)]
struct WorkerReport {
    completed: Vec<CompletedTask>,
    failures: Vec<FailedAttempt>,
    withdrawn: Vec<TaskId>,
}

/// Runs every registered agent against a scheduler until no work is left.
pub struct Dispatcher {
    scheduler: Arc<Scheduler>,
    executor: Arc<dyn TaskExecutor>,
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        scheduler: Arc<Scheduler>,
        executor: Arc<dyn TaskExecutor>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            scheduler,
            executor,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run early when `cancel` fires.
    ///
    /// Workers finish the execution in flight, report it, then stop.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run all agents until each one is idle for good, or until cancelled.
    ///
    /// # Errors
    /// Returns the first scheduler error any worker hit, or `TaskJoin` if a
    /// worker panicked.
    pub async fn run(&self) -> Result<RunSummary> {
        let agents = self.scheduler.agent_ids();
        dlog!("Dispatcher starting with {} agents", agents.len());

        let handles: Vec<_> = agents
            .into_iter()
            .map(|agent_id| {
                let worker = Worker {
                    agent_id,
                    scheduler: Arc::clone(&self.scheduler),
                    executor: Arc::clone(&self.executor),
                    config: self.config.clone(),
                    cancel: self.cancel.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut summary = RunSummary::default();
        let mut first_error = None;
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(report)) => summary.merge(report),
                Ok(Err(e)) => {
                    dlog_warn!("Dispatcher worker failed: {}", e);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(Error::TaskJoin(e.to_string()));
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        summary.stats = self.scheduler.get_stats();
        dlog!(
            "Dispatcher finished: {} completed, {} failed attempts, {} withdrawn",
            summary.completed.len(),
            summary.failures.len(),
            summary.withdrawn.len()
        );
        Ok(summary)
    }
}

struct Worker {
    agent_id: AgentId,
    scheduler: Arc<Scheduler>,
    executor: Arc<dyn TaskExecutor>,
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) -> Result<WorkerReport> {
        let mut report = WorkerReport::default();
        dlog_debug!(agent = self.agent_id; "worker started");

        while !self.cancel.is_cancelled() {
            let task = match self.scheduler.get_next_task(&self.agent_id)? {
                Some(task) => task,
                None => {
                    if self.scheduler.is_idle_for(&self.agent_id)? {
                        break;
                    }
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                    continue;
                }
            };

            let result = self.execute(task).await?;
            self.report(result, &mut report)?;
        }

        dlog_debug!(
            agent = self.agent_id;
            "worker stopped after {} completions", report.completed.len()
        );
        Ok(report)
    }

    async fn execute(&self, task: Task) -> Result<TaskResult> {
        let stats = self
            .scheduler
            .get_agent_stats(&self.agent_id)
            .ok_or_else(|| Error::UnknownAgent {
                id: self.agent_id.clone(),
            })?;
        let task_id = task.id.clone();
        let executor = Arc::clone(&self.executor);
        let started = Instant::now();

        dlog_trace!(agent = self.agent_id, task = task_id; "executing");
        let outcome =
            blocking_with_timeout(self.config.execution_timeout, move || executor.execute(&task, &stats))
                .await;

        let mut result = match outcome {
            Ok(result) => result,
            Err(Error::Timeout(limit)) => TaskResult::failure(
                task_id.clone(),
                self.agent_id.clone(),
                &format!("execution timed out after {:?}", limit),
            ),
            Err(e) => TaskResult::failure(task_id.clone(), self.agent_id.clone(), &e.to_string()),
        };

        // The outcome always belongs to the assignment that produced it.
        result.task_id = task_id;
        result.agent_id = self.agent_id.clone();
        if result.completion_time == 0 {
            result.completion_time = elapsed_minutes(started.elapsed());
        }
        Ok(result)
    }

    fn report(&self, result: TaskResult, report: &mut WorkerReport) -> Result<()> {
        let task_id = result.task_id.clone();

        if result.success {
            let completed = CompletedTask {
                task_id: task_id.clone(),
                agent_id: self.agent_id.clone(),
                quality: result.quality.min(100),
                learning_gained: result.learning_gained,
            };
            self.scheduler.complete_task(result)?;
            report.completed.push(completed);
            return Ok(());
        }

        let failure = FailedAttempt {
            task_id: task_id.clone(),
            agent_id: self.agent_id.clone(),
            errors: result.errors.clone(),
        };
        self.scheduler.complete_task(result)?;
        report.failures.push(failure);

        let max_attempts = self.config.max_task_attempts.max(1);
        let exhausted = self
            .scheduler
            .get_task(&task_id)
            .map(|record| record.failed_attempts >= max_attempts)
            .unwrap_or(false);
        if exhausted && self.scheduler.withdraw_task(&task_id) {
            dlog_warn!(task = task_id; "withdrawn after {} failed attempts", max_attempts);
            report.withdrawn.push(task_id);
        }
        Ok(())
    }
}
