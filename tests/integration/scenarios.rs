//! Assignment and completion walkthroughs.
//!
//! Each test follows one realistic sequence of calls against a single
//! scheduler and checks the observable state afterwards.

use dojo::{AgentId, Error, Priority, SchedulerEvent, Task, TaskId, TaskResult, Tier};

use crate::fixtures::{chain_tasks, independent_tasks, test_task, SchedulerHarness};

/// Test: Skilled beginner receives a matching beginner task
/// Given agent a1 with javascript and api skills
/// When a beginner task requiring those skills is queued
/// Then get_next_task hands it to a1
#[test]
fn test_skilled_agent_receives_matching_task() {
    let harness = SchedulerHarness::default();
    harness
        .scheduler
        .register_agent_with_skills("a1", [("javascript", 60.0), ("api", 50.0)]);
    harness.add(
        Task::new("t1", "Build REST API")
            .with_skill("javascript")
            .with_skill("api"),
    );

    let task = harness
        .scheduler
        .get_next_task(&AgentId::from("a1"))
        .unwrap()
        .unwrap();

    assert_eq!(task.id, TaskId::from("t1"));
    assert_eq!(task.title, "Build REST API");
}

/// Test: Expert task is withheld from a beginner
#[test]
fn test_expert_task_withheld_from_beginner() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    harness.add(test_task("expert").with_tier(Tier::Expert));

    assert_eq!(harness.next(&a1), None);
    assert_eq!(harness.scheduler.get_stats().queued_tasks, 1);
}

/// Test: Concurrency cap
/// Given max_concurrent_tasks = 3 and five queued tasks
/// When a2 asks four times without completing anything
/// Then the first three succeed and the fourth returns nothing
#[test]
fn test_concurrency_cap_of_three() {
    let harness = SchedulerHarness::with_capacity(3);
    let a2 = harness.agent("a2");
    for task in independent_tasks(5) {
        harness.add(task);
    }

    for _ in 0..3 {
        assert!(harness.next(&a2).is_some());
    }
    assert_eq!(harness.next(&a2), None);

    let stats = harness.scheduler.get_agent_stats(&a2).unwrap();
    assert_eq!(stats.active_tasks.len(), 3);
}

/// Test: Prerequisite gating
/// Given t2 requires t1 and t2 is queued first
/// When a1 asks twice without completing t1
/// Then it receives t1 and then nothing
#[test]
fn test_prerequisite_gating() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    harness.add(test_task("t2").requires("t1"));
    harness.add(test_task("t1"));

    assert_eq!(harness.next(&a1), Some(TaskId::from("t1")));
    assert_eq!(harness.next(&a1), None);

    harness.succeed(&TaskId::from("t1"), &a1, 10.0);
    assert_eq!(harness.next(&a1), Some(TaskId::from("t2")));
}

/// Test: Successful completion updates the profile
#[test]
fn test_completion_updates_profile() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    harness.add(test_task("t1"));
    harness.next(&a1);

    harness
        .scheduler
        .complete_task(TaskResult::success("t1", "a1", 85, 40.0))
        .unwrap();

    let stats = harness.scheduler.get_agent_stats(&a1).unwrap();
    assert_eq!(stats.total_experience, 40.0);
    assert!(stats.completed_tasks.contains(&TaskId::from("t1")));
    assert_eq!(stats.success_rate, 1.0);
}

/// Test: High priority jumps ahead of earlier low priority work
#[test]
fn test_high_priority_served_first() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    harness.add(test_task("low").with_priority(Priority::Low));
    harness.add(test_task("high").with_priority(Priority::High));

    assert_eq!(harness.next(&a1), Some(TaskId::from("high")));
    assert_eq!(harness.next(&a1), Some(TaskId::from("low")));
}

/// Test: Prerequisites are per agent
/// Given a chain c0 <- c1 and two agents
/// When a1 completes c0
/// Then only a1 may take c1
#[test]
fn test_prerequisites_are_per_agent() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    let a2 = harness.agent("a2");
    for task in chain_tasks(2) {
        harness.add(task);
    }

    assert_eq!(harness.next(&a1), Some(TaskId::from("c0")));
    harness.succeed(&TaskId::from("c0"), &a1, 5.0);

    assert_eq!(harness.next(&a2), None);
    assert_eq!(harness.next(&a1), Some(TaskId::from("c1")));
}

/// Test: A failed task is retried, not lost
#[test]
fn test_failed_task_is_retried_by_another_agent() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    let a2 = harness.agent("a2");
    harness.add(test_task("t1"));

    assert_eq!(harness.next(&a1), Some(TaskId::from("t1")));
    harness
        .scheduler
        .complete_task(TaskResult::failure("t1", "a1", "compile error"))
        .unwrap();

    assert_eq!(harness.next(&a2), Some(TaskId::from("t1")));
    harness.succeed(&TaskId::from("t1"), &a2, 12.0);

    let a1_stats = harness.scheduler.get_agent_stats(&a1).unwrap();
    assert_eq!(a1_stats.total_experience, 0.0);
    assert_eq!(a1_stats.failure_count, 1);
    assert_eq!(harness.scheduler.get_stats().failed_attempts, 1);
}

/// Test: Experience unlocks higher tiers
#[test]
fn test_experience_unlocks_tiers() {
    let harness = SchedulerHarness::new(dojo::SchedulerConfig {
        learning_threshold: 50.0,
        ..Default::default()
    });
    let a1 = harness.agent("a1");
    harness.add(test_task("warmup"));
    harness.add(test_task("advanced").with_tier(Tier::Intermediate));

    assert_eq!(harness.next(&a1), Some(TaskId::from("warmup")));
    assert_eq!(harness.next(&a1), None);

    harness.succeed(&TaskId::from("warmup"), &a1, 60.0);

    assert_eq!(
        harness.scheduler.get_agent_stats(&a1).unwrap().tier,
        Tier::Intermediate
    );
    assert_eq!(harness.next(&a1), Some(TaskId::from("advanced")));
}

/// Test: Wrong agent cannot complete someone else's task
#[test]
fn test_foreign_completion_rejected_without_side_effects() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    let a2 = harness.agent("a2");
    harness.add(test_task("t1"));
    harness.next(&a1);
    let before = harness.scheduler.get_stats();

    let result = harness
        .scheduler
        .complete_task(TaskResult::success("t1", a2.clone(), 90, 50.0));

    assert!(matches!(result, Err(Error::InvalidCompletion { .. })));
    assert_eq!(harness.scheduler.get_stats(), before);
    assert_eq!(
        harness.scheduler.get_agent_stats(&a2).unwrap().total_experience,
        0.0
    );
}

/// Test: Duplicate task ids are rejected
#[test]
fn test_duplicate_task_rejected() {
    let harness = SchedulerHarness::default();
    harness.add(test_task("t1"));

    let result = harness.scheduler.add_task(test_task("t1"));

    assert!(matches!(result, Err(Error::TaskAlreadyExists { .. })));
    assert_eq!(harness.scheduler.get_stats().total_tasks, 1);
}

/// Test: Cancelling returns the task to its original slot
#[test]
fn test_cancel_keeps_queue_position() {
    let harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    let a2 = harness.agent("a2");
    for task in independent_tasks(3) {
        harness.add(task);
    }

    assert_eq!(harness.next(&a1), Some(TaskId::from("t0")));
    assert!(harness.scheduler.cancel_task(&TaskId::from("t0")));

    assert_eq!(harness.next(&a2), Some(TaskId::from("t0")));
}

/// Test: Lifecycle events arrive in call order
#[test]
fn test_event_stream_follows_lifecycle() {
    let mut harness = SchedulerHarness::default();
    let a1 = harness.agent("a1");
    harness.add(test_task("t1"));
    harness.next(&a1);
    harness
        .scheduler
        .complete_task(TaskResult::failure("t1", "a1", "flaky"))
        .unwrap();
    assert!(harness.scheduler.withdraw_task(&TaskId::from("t1")));

    let events = harness.drain_events();

    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            SchedulerEvent::AgentRegistered { .. } => "registered",
            SchedulerEvent::TaskQueued { .. } => "queued",
            SchedulerEvent::TaskAssigned { .. } => "assigned",
            SchedulerEvent::TaskFailed { .. } => "failed",
            SchedulerEvent::TaskWithdrawn { .. } => "withdrawn",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["registered", "queued", "assigned", "failed", "withdrawn"]
    );
}

/// Test: Recommendations favour new skills and longer tasks
#[test]
fn test_recommendations_prefer_growth() {
    let harness = SchedulerHarness::default();
    harness
        .scheduler
        .register_agent_with_skills("a1", [("javascript", 80.0)]);
    harness.add(test_task("familiar").with_skill("javascript"));
    harness.add(test_task("stretch").with_skill("javascript").with_skill("sql"));
    harness.add(test_task("locked").with_tier(Tier::Advanced));

    let recommended: Vec<TaskId> = harness
        .scheduler
        .get_recommended_tasks(&AgentId::from("a1"), 5)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();

    assert_eq!(
        recommended,
        vec![TaskId::from("stretch"), TaskId::from("familiar")]
    );
}
