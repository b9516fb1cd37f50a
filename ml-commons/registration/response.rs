use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an ML task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Accepted, not yet started.
    Created,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped by the caller.
    Cancelled,
    /// Finished, with some sub-steps failing.
    CompletedWithError,
}

impl TaskState {
    /// Wire name, e.g. `CREATED`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::CompletedWithError => "COMPLETED_WITH_ERROR",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of ML task a [`TaskResponse`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Model training.
    Training,
    /// Batch prediction.
    Prediction,
    /// Train then predict in one request.
    TrainingAndPrediction,
    /// Generic execution.
    Execution,
    /// Model metadata registration.
    RegisterModel,
    /// Model deployment.
    DeployModel,
}

/// Terminal success of a registration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterModelMetaResponse {
    /// Id assigned by the metadata store.
    pub model_id: String,
    /// Always [`TaskState::Created`] for a fresh registration.
    pub status: TaskState,
}

impl RegisterModelMetaResponse {
    /// Response for a newly created model.
    #[must_use]
    pub fn created(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            status: TaskState::Created,
        }
    }
}

/// Acknowledgement returned when a task is accepted for background processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Task id.
    pub task_id: String,
    /// Task kind, omitted when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    /// Current state.
    pub status: TaskState,
}
