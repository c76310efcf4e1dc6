//! Concurrent access tests.
//!
//! Many OS threads share one scheduler and race for the same queue. These
//! tests check that every task is handed out exactly once and that the
//! concurrency cap holds no matter how calls interleave.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use dojo::{AgentId, SchedulerConfig, SchedulerEvent, TaskId, TaskResult};

use crate::fixtures::{independent_tasks, SchedulerHarness};

const AGENTS: usize = 8;

/// Test: No double assignment under contention
/// Given 8 agents with capacity 3 and 24 tasks
/// When every agent grabs as many tasks as it can at the same time
/// Then all 24 tasks are assigned exactly once
#[test]
fn test_no_double_assignment() {
    let harness = SchedulerHarness::with_capacity(3);
    let agents: Vec<AgentId> = (0..AGENTS).map(|i| harness.agent(&format!("a{}", i))).collect();
    for task in independent_tasks(AGENTS * 3) {
        harness.add(task);
    }

    let handles: Vec<_> = agents
        .into_iter()
        .map(|agent| {
            let scheduler = Arc::clone(&harness.scheduler);
            thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(task) = scheduler.get_next_task(&agent).unwrap() {
                    taken.push(task.id);
                }
                (agent, taken)
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let (agent, taken) = handle.join().unwrap();
        assert!(taken.len() <= 3, "{} exceeded its cap", agent);
        for id in taken {
            assert!(seen.insert(id.clone()), "{} assigned twice", id);
        }
    }
    assert_eq!(seen.len(), AGENTS * 3);
    assert_eq!(harness.scheduler.get_stats().queued_tasks, 0);
}

/// Test: Full work loop across threads
/// Given 200 tasks and 8 agents that take, complete and repeat
/// When all threads run until the queue is empty
/// Then every task is completed once and experience adds up
#[test]
fn test_parallel_work_loop_completes_everything() {
    let harness = SchedulerHarness::new(SchedulerConfig {
        max_concurrent_tasks: 2,
        enable_adaptive_learning: false,
        ..Default::default()
    });
    let agents: Vec<AgentId> = (0..AGENTS).map(|i| harness.agent(&format!("a{}", i))).collect();
    let tasks = independent_tasks(200);
    for task in tasks {
        harness.add(task);
    }

    thread::scope(|scope| {
        for agent in &agents {
            let scheduler = &harness.scheduler;
            scope.spawn(move || {
                while let Some(task) = scheduler.get_next_task(agent).unwrap() {
                    scheduler
                        .complete_task(TaskResult::success(task.id, agent.clone(), 70, 1.0))
                        .unwrap();
                }
            });
        }
    });

    let stats = harness.scheduler.get_stats();
    assert_eq!(stats.completed_tasks, 200);
    assert!(stats.is_drained());

    let total_xp: f64 = agents
        .iter()
        .map(|a| harness.scheduler.get_agent_stats(a).unwrap().total_experience)
        .sum();
    assert_eq!(total_xp, 200.0);

    let mut completed: Vec<TaskId> = agents
        .iter()
        .flat_map(|a| harness.scheduler.get_agent_stats(a).unwrap().completed_tasks)
        .collect();
    completed.sort();
    completed.dedup();
    assert_eq!(completed.len(), 200);
}

/// Test: Events follow lock order across threads
/// Given 4 agents with capacity 1 racing over 2 tasks
/// When each repeatedly takes a task and cancels it
/// Then every task's events alternate assigned/cancelled by the same agent
#[test]
fn test_events_follow_lock_order() {
    let mut harness = SchedulerHarness::with_capacity(1);
    let agents: Vec<AgentId> = (0..4).map(|i| harness.agent(&format!("a{}", i))).collect();
    for task in independent_tasks(2) {
        harness.add(task);
    }
    harness.drain_events();

    thread::scope(|scope| {
        for agent in &agents {
            let scheduler = &harness.scheduler;
            scope.spawn(move || {
                for _ in 0..100 {
                    if let Some(task) = scheduler.get_next_task(agent).unwrap() {
                        scheduler.cancel_task(&task.id);
                    }
                }
            });
        }
    });

    let events = harness.drain_events();
    assert!(!events.is_empty());

    // Per task, the current holder according to the stream.
    let mut holder: HashMap<TaskId, AgentId> = HashMap::new();
    for event in events {
        match event {
            SchedulerEvent::TaskAssigned { task_id, agent_id } => {
                let previous = holder.insert(task_id.clone(), agent_id);
                assert!(previous.is_none(), "{} assigned while held", task_id);
            }
            SchedulerEvent::TaskCancelled { task_id, agent_id } => {
                assert_eq!(
                    holder.remove(&task_id),
                    Some(agent_id),
                    "{} cancelled before its assignment",
                    task_id
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert!(holder.is_empty());
}

/// Test: Readers see consistent counts while writers run
#[test]
fn test_stats_consistent_under_load() {
    let harness = SchedulerHarness::with_capacity(4);
    let agents: Vec<AgentId> = (0..4).map(|i| harness.agent(&format!("a{}", i))).collect();
    for task in independent_tasks(100) {
        harness.add(task);
    }

    thread::scope(|scope| {
        for agent in &agents {
            let scheduler = &harness.scheduler;
            scope.spawn(move || {
                while let Some(task) = scheduler.get_next_task(agent).unwrap() {
                    scheduler
                        .complete_task(TaskResult::success(task.id, agent.clone(), 50, 0.5))
                        .unwrap();
                }
            });
        }

        let scheduler = &harness.scheduler;
        scope.spawn(move || {
            for _ in 0..200 {
                let stats = scheduler.get_stats();
                assert_eq!(
                    stats.queued_tasks + stats.active_tasks + stats.completed_tasks,
                    100
                );
                assert!(stats.active_tasks <= 4 * 4);
            }
        });
    });
}
