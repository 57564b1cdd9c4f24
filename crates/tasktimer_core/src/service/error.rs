//! Error taxonomy shared by registry, session and facade calls.

use crate::model::task::{TaskId, TaskValidationError};
use crate::repo::task_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TimerResult<T> = Result<T, TimerError>;

/// Errors surfaced to the UI shell.
#[derive(Debug)]
pub enum TimerError {
    /// Bad user input; nothing was mutated.
    Validation(TaskValidationError),
    /// A session is already live; the existing session is untouched.
    AlreadyRunning { task_id: TaskId },
    /// Unknown task ID.
    NotFound(TaskId),
    /// Lookup by display name found nothing.
    NameNotFound(String),
    /// A session control was used while no session is live.
    NoActiveSession,
    /// Persistence failure.
    Storage(RepoError),
    /// A background thread could not be started.
    Spawn(std::io::Error),
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AlreadyRunning { task_id } => {
                write!(f, "another task is already running (task {task_id})")
            }
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::NameNotFound(name) => write!(f, "task not found: `{name}`"),
            Self::NoActiveSession => write!(f, "no task is running"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Spawn(err) => write!(f, "failed to start background thread: {err}"),
        }
    }
}

impl Error for TimerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for TimerError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TimerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}
