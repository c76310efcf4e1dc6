use thiserror::Error;

use crate::core::{AgentId, TaskId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown agent: {id}")]
    UnknownAgent { id: AgentId },

    #[error("Task already exists: {id}")]
    TaskAlreadyExists { id: TaskId },

    #[error("Task not found: {id}")]
    TaskNotFound { id: TaskId },

    #[error("Task {task_id} is not active under agent {agent_id}")]
    InvalidCompletion { task_id: TaskId, agent_id: AgentId },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
