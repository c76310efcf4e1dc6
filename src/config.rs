use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{dlog_debug, Error, Result};

/// Weights of the learning value formula.
///
/// `value = base + unfamiliar_skill_bonus * unfamiliar_skills
///        + difficulty_per_minute * estimated_time`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningWeights {
    #[serde(default = "default_unfamiliar_skill_bonus")]
    pub unfamiliar_skill_bonus: f64,
    #[serde(default = "default_difficulty_per_minute")]
    pub difficulty_per_minute: f64,
}

fn default_unfamiliar_skill_bonus() -> f64 {
    5.0
}

fn default_difficulty_per_minute() -> f64 {
    1.0
}

impl Default for LearningWeights {
    fn default() -> Self {
        Self {
            unfamiliar_skill_bonus: default_unfamiliar_skill_bonus(),
            difficulty_per_minute: default_difficulty_per_minute(),
        }
    }
}

/// Scheduler configuration, fixed for the lifetime of a scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum tasks a single agent may hold at once.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    /// Experience per tier step.
    #[serde(default = "default_learning_threshold")]
    pub learning_threshold: f64,
    /// Recompute tiers after successful completions.
    #[serde(default = "default_true")]
    pub enable_adaptive_learning: bool,
    #[serde(default)]
    pub learning_weights: LearningWeights,
}

fn default_max_concurrent_tasks() -> usize {
    3
}

fn default_learning_threshold() -> f64 {
    500.0
}

fn default_true() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            learning_threshold: default_learning_threshold(),
            enable_adaptive_learning: true,
            learning_weights: LearningWeights::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn dojo_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".dojo"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::dojo_dir()?.join("dojo.toml"))
    }

    pub fn state_path() -> Result<PathBuf> {
        Ok(Self::dojo_dir()?.join("state.json"))
    }

    /// Load from the default location (~/.dojo/dojo.toml).
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        dlog_debug!("SchedulerConfig::load path={}", path.display());
        if !path.exists() {
            dlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        dlog_debug!(
            "Config loaded: max_concurrent_tasks={}, learning_threshold={}, adaptive={}",
            config.max_concurrent_tasks,
            config.learning_threshold,
            config.enable_adaptive_learning
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                dlog_debug!("Creating config directory: {}", parent.display());
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        dlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Reject values the scheduler cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(Error::Validation(
                "max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        if !self.learning_threshold.is_finite() || self.learning_threshold <= 0.0 {
            return Err(Error::Validation(format!(
                "learning_threshold must be a positive number, got {}",
                self.learning_threshold
            )));
        }
        let weights = &self.learning_weights;
        for (name, weight) in [
            ("unfamiliar_skill_bonus", weights.unfamiliar_skill_bonus),
            ("difficulty_per_minute", weights.difficulty_per_minute),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Validation(format!(
                    "learning weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Settings for the host dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Sleep between polls when an agent has nothing to do.
    pub poll_interval: Duration,
    /// Executions running longer than this are reported as failures.
    pub execution_timeout: Duration,
    /// Failed attempts after which a task is withdrawn from the queue.
    pub max_task_attempts: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            execution_timeout: Duration::from_secs(300),
            max_task_attempts: 3,
        }
    }
}
