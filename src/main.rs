use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use dojo::config::{DispatchConfig, SchedulerConfig};
use dojo::{
    dlog, dlog_error, AgentId, Dispatcher, Plan, RunSummary, Scheduler, SchedulerEvent, SimulatedExecutor,
    SnapshotStore, TaskId, Result,
};

const EVENT_BUFFER: usize = 1024;

/// Dojo - learning-aware task scheduler for teams of agents
#[derive(Parser, Debug)]
#[command(name = "dojo")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    DOJO_DEBUG=1           Enable debug logging (alternative to --debug)\n    DOJO_LOG_LEVEL=LEVEL   Log level: error, warn, info, debug, trace\n    DOJO_LOG=PATH          Log file (default: ~/.dojo/dojo.log)")]
pub struct Cli {
    /// Scheduler config file (default: ~/.dojo/dojo.toml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (writes to ~/.dojo/dojo.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run a plan to completion with the simulated executor
    Run {
        /// Plan file (TOML)
        plan: PathBuf,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Save the final scheduler state to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Rank the tasks in a plan by learning value for one agent
    Recommend {
        /// Plan file (TOML)
        plan: PathBuf,

        /// Agent to recommend for
        #[arg(long)]
        agent: String,

        /// Number of tasks to show
        #[arg(long, short = 'n', default_value_t = 5)]
        limit: usize,
    },

    /// Show the tasks an agent must finish before a target task
    Path {
        /// Plan file (TOML)
        plan: PathBuf,

        #[arg(long)]
        agent: String,

        /// Target task id
        #[arg(long)]
        task: String,
    },

    /// Show statistics of a saved snapshot (default: ~/.dojo/state.json)
    Stats {
        snapshot: Option<PathBuf>,
    },

    /// Print the effective scheduler configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    dojo::log::init(cli.debug);
    dlog!("Dojo starting: {:?}", cli.command);

    let result = run(cli);
    if let Err(e) = &result {
        dlog_error!("{}", e);
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = || load_config(cli.config.as_deref());
    match cli.command {
        Command::Run {
            plan,
            json,
            snapshot,
        } => run_plan(&plan, config()?, json, snapshot),
        Command::Recommend { plan, agent, limit } => run_recommend(&plan, config()?, agent, limit),
        Command::Path { plan, agent, task } => run_path(&plan, config()?, agent, task),
        // The snapshot carries the config it was taken under.
        Command::Stats { snapshot } => run_stats(snapshot),
        Command::Config => run_config(&config()?),
    }
}

fn load_config(path: Option<&Path>) -> Result<SchedulerConfig> {
    match path {
        Some(path) => SchedulerConfig::load_from(path),
        None => SchedulerConfig::load(),
    }
}

/// Load a plan, dispatch it with the simulated executor and report the run.
fn run_plan(
    plan_path: &Path,
    config: SchedulerConfig,
    json: bool,
    snapshot: Option<PathBuf>,
) -> Result<()> {
    let plan = Plan::load(plan_path)?;
    let executor = SimulatedExecutor::new(config.learning_weights);

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(async {
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
        let printer = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if !json {
                    print_event(&event);
                }
            }
        });

        let scheduler = Arc::new(Scheduler::new(config)?.with_events(event_tx));
        plan.apply(&scheduler)?;

        let dispatcher = Dispatcher::new(
            Arc::clone(&scheduler),
            Arc::new(executor),
            DispatchConfig::default(),
        );
        let summary = dispatcher.run().await?;

        if let Some(path) = &snapshot {
            SnapshotStore::new(path).save(&scheduler.snapshot())?;
            dlog!("Snapshot written to {}", path.display());
        }

        // Closing the last sender ends the printer.
        drop(dispatcher);
        drop(scheduler);
        if let Err(e) = printer.await {
            dlog!("Event printer stopped abnormally: {}", e);
        }
        Ok::<RunSummary, dojo::Error>(summary)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        if let Some(path) = snapshot {
            println!("  Snapshot:    {}", path.display());
        }
    }
    Ok(())
}

fn print_event(event: &SchedulerEvent) {
    match event {
        SchedulerEvent::TaskAssigned { task_id, agent_id } => {
            println!("  assign    {} -> {}", task_id, agent_id)
        }
        SchedulerEvent::TaskCompleted {
            task_id,
            agent_id,
            learning_gained,
        } => println!(
            "  complete  {} by {} (+{:.1} xp)",
            task_id, agent_id, learning_gained
        ),
        SchedulerEvent::TaskFailed {
            task_id,
            agent_id,
            attempts,
            errors,
        } => println!(
            "  fail      {} by {} (attempt {}): {}",
            task_id,
            agent_id,
            attempts,
            errors.join("; ")
        ),
        SchedulerEvent::TaskWithdrawn { task_id } => println!("  withdraw  {}", task_id),
        SchedulerEvent::TierAdvanced { agent_id, from, to } => {
            println!("  tier      {} {} -> {}", agent_id, from, to)
        }
        _ => {}
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Run complete");
    println!("  Completed:   {}", summary.completed.len());
    println!("  Failures:    {}", summary.failures.len());
    if !summary.withdrawn.is_empty() {
        let ids: Vec<String> = summary.withdrawn.iter().map(TaskId::to_string).collect();
        println!("  Withdrawn:   {}", ids.join(", "));
    }
    println!("  Still queued: {}", summary.stats.queued_tasks);
    println!("  Stats:       {}", summary.stats);
}

fn run_recommend(plan_path: &Path, config: SchedulerConfig, agent: String, limit: usize) -> Result<()> {
    let scheduler = Plan::load(plan_path)?.into_scheduler(config)?;
    let agent_id = AgentId::from(agent);
    let stats = scheduler
        .get_agent_stats(&agent_id)
        .ok_or_else(|| dojo::Error::UnknownAgent {
            id: agent_id.clone(),
        })?;

    let recommended = scheduler.get_recommended_tasks(&agent_id, limit)?;
    if recommended.is_empty() {
        println!("No eligible tasks for {}", agent_id);
        return Ok(());
    }

    println!("Recommended for {} ({}):", agent_id, stats.tier);
    for (rank, task) in recommended.iter().enumerate() {
        println!(
            "  {}. {:<20} {:>6.1}  {} [{}]",
            rank + 1,
            task.id.to_string(),
            scheduler.calculate_learning_value(task, &stats),
            task.title,
            task.priority
        );
    }
    Ok(())
}

fn run_path(plan_path: &Path, config: SchedulerConfig, agent: String, task: String) -> Result<()> {
    let scheduler = Plan::load(plan_path)?.into_scheduler(config)?;
    let agent_id = AgentId::from(agent);
    let path = scheduler.learning_path(&agent_id, &TaskId::from(task))?;

    for (step, task_id) in path.iter().enumerate() {
        let title = scheduler
            .get_task(task_id)
            .map(|record| record.task.title)
            .unwrap_or_default();
        println!("  {}. {} {}", step + 1, task_id, title);
    }
    Ok(())
}

fn run_stats(snapshot: Option<PathBuf>) -> Result<()> {
    let store = match snapshot {
        Some(path) => SnapshotStore::new(path),
        None => SnapshotStore::default_location()?,
    };
    let Some(snapshot) = store.load()? else {
        println!("No snapshot at {}", store.path().display());
        return Ok(());
    };

    let scheduler = Scheduler::restore(snapshot)?;
    let stats = scheduler.get_stats();
    println!("{}", stats);
    for (tier, count) in &stats.tier_distribution {
        println!("  {:<13} {}", tier.to_string(), count);
    }
    Ok(())
}

fn run_config(config: &SchedulerConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
