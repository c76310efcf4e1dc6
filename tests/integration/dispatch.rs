//! Dispatcher end-to-end tests.
//!
//! These tests load agents and tasks, hand the scheduler to a
//! [`Dispatcher`] and check the run summary and final scheduler state.

use std::sync::Arc;
use std::time::Duration;

use dojo::{
    AgentId, AgentStats, DispatchConfig, Dispatcher, Plan, SchedulerConfig, SchedulerEvent,
    SimulatedExecutor, Task, TaskExecutor, TaskId, TaskResult, Tier,
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::fixtures::{chain_tasks, independent_tasks, SchedulerHarness};

fn fast() -> DispatchConfig {
    DispatchConfig {
        poll_interval: Duration::from_millis(1),
        execution_timeout: Duration::from_secs(5),
        max_task_attempts: 3,
    }
}

/// Records which agent ran which task, in execution order.
#[derive(Default)]
struct RecordingExecutor {
    runs: Mutex<Vec<(AgentId, TaskId)>>,
}

impl TaskExecutor for RecordingExecutor {
    fn execute(&self, task: &Task, agent: &AgentStats) -> TaskResult {
        self.runs.lock().push((agent.id.clone(), task.id.clone()));
        std::thread::sleep(Duration::from_millis(2));
        TaskResult::success(task.id.clone(), agent.id.clone(), 90, 5.0)
    }
}

/// Test: Dispatcher drains a mixed plan
/// Given four agents, a chain and independent tasks
/// When the dispatcher runs
/// Then every task completes and the scheduler is drained
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dispatcher_drains_plan() {
    let mut harness = SchedulerHarness::default();
    for i in 0..4 {
        harness.agent(&format!("a{}", i));
    }
    for task in independent_tasks(20).into_iter().chain(chain_tasks(5)) {
        harness.add(task);
    }

    let executor = Arc::new(RecordingExecutor::default());
    let summary = Dispatcher::new(Arc::clone(&harness.scheduler), executor.clone(), fast())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.completed.len(), 25);
    assert!(summary.stats.is_drained());
    assert_eq!(executor.runs.lock().len(), 25);

    // Chain links run in order, all by whoever finished the previous link.
    let runs = executor.runs.lock();
    let chain: Vec<&(AgentId, TaskId)> = runs
        .iter()
        .filter(|(_, task)| task.as_str().starts_with('c'))
        .collect();
    let order: Vec<&str> = chain.iter().map(|(_, task)| task.as_str()).collect();
    assert_eq!(order, vec!["c0", "c1", "c2", "c3", "c4"]);
    assert!(chain.iter().all(|(agent, _)| agent == &chain[0].0));

    let completions = harness
        .drain_events()
        .into_iter()
        .filter(|event| matches!(event, SchedulerEvent::TaskCompleted { .. }))
        .count();
    assert_eq!(completions, 25);
}

/// Test: Plan with a flaky task and an unreachable task
#[tokio::test]
async fn test_dispatcher_reports_withdrawn_and_unreachable() {
    let plan = Plan::from_toml(
        r#"
[[agents]]
id = "alice"
skills = { rust = 40.0 }

[[tasks]]
id = "parse"
title = "Write parser"
required_skills = ["rust"]

[[tasks]]
id = "flaky"
title = "Flaky integration"

[[tasks]]
id = "kernel"
title = "Kernel module"
tier = "expert"
"#,
    )
    .unwrap();
    let scheduler = Arc::new(plan.into_scheduler(SchedulerConfig::default()).unwrap());
    let executor = SimulatedExecutor::default().failing("flaky", 100);

    let summary = Dispatcher::new(Arc::clone(&scheduler), Arc::new(executor), fast())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.completed.len(), 1);
    assert_eq!(summary.completed[0].task_id, TaskId::from("parse"));
    assert_eq!(summary.failures.len(), 3);
    assert_eq!(summary.withdrawn, vec![TaskId::from("flaky")]);
    assert_eq!(summary.stats.queued_tasks, 1);
    assert_eq!(summary.stats.cancelled_tasks, 1);

    let alice = scheduler.get_agent_stats(&AgentId::from("alice")).unwrap();
    assert_eq!(alice.tier, Tier::Beginner);
    assert!(alice.skills["rust"] > 40.0);
    assert_eq!(alice.failure_count, 3);
}

/// Test: Cancellation stops a long run early
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatcher_cancellation() {
    let harness = SchedulerHarness::default();
    harness.agent("a1");
    for task in independent_tasks(500) {
        harness.add(task);
    }

    let cancel = CancellationToken::new();
    let executor = SimulatedExecutor::default().with_delay(Duration::from_millis(5));
    let dispatcher = Dispatcher::new(Arc::clone(&harness.scheduler), Arc::new(executor), fast())
        .with_cancellation(cancel.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });
    let summary = dispatcher.run().await.unwrap();
    canceller.await.unwrap();

    assert!(summary.completed.len() < 500);
    assert_eq!(summary.stats.active_tasks, 0);
    assert_eq!(
        summary.stats.queued_tasks + summary.stats.completed_tasks,
        500
    );
}

/// Test: No agents means nothing runs
#[tokio::test]
async fn test_dispatcher_without_agents() {
    let harness = SchedulerHarness::default();
    harness.add(Task::new("t1", "Orphan"));

    let summary = Dispatcher::new(
        Arc::clone(&harness.scheduler),
        Arc::new(SimulatedExecutor::default()),
        fast(),
    )
    .run()
    .await
    .unwrap();

    assert!(summary.completed.is_empty());
    assert_eq!(summary.stats.queued_tasks, 1);
}
