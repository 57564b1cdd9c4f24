//! Task record, creation draft and display helpers.
//!
//! # Invariants
//! - `elapsed` is never negative; manual decrements floor at zero.
//! - `min_time`/`max_time` are seconds. `max >= min` is caller convention and
//!   is not enforced here.
//! - `completed` is only ever set by minimum-threshold crossing and is not
//!   cleared by the daily reset.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned task identifier (`tasks.id`).
pub type TaskId = i64;

const SECONDS_PER_MINUTE: u64 = 60;
/// Largest threshold the `INTEGER` columns can hold.
const MAX_STORED_SECONDS: u64 = i64::MAX as u64;

/// One user-defined unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Seconds at/above which the task is marked complete.
    pub min_time: Option<u64>,
    /// Seconds at/above which a running session is force-stopped.
    pub max_time: Option<u64>,
    /// Accumulated seconds since the last daily reset.
    pub elapsed: u64,
    /// Persisted as `tasks.checkmark`.
    pub completed: bool,
}

impl Task {
    /// Returns whether the task has neither threshold configured.
    pub fn is_no_timer(&self) -> bool {
        self.min_time.is_none() && self.max_time.is_none()
    }

    /// Renders the classic row text used by list views.
    ///
    /// Example: `Write report - ✔ (Total Time: 00:05:00) Min: 5 min Max: 30 min`.
    pub fn display_line(&self) -> String {
        let mut line = format!("{} -", self.name);
        if self.completed {
            line.push_str(" ✔");
        }
        line.push_str(&format!(" (Total Time: {})", format_hms(self.elapsed)));
        if let Some(min) = self.min_time {
            line.push_str(&format!(" Min: {} min", min / SECONDS_PER_MINUTE));
        }
        if let Some(max) = self.max_time {
            line.push_str(&format!(" Max: {} min", max / SECONDS_PER_MINUTE));
        }
        line
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub min_time: Option<u64>,
    pub max_time: Option<u64>,
}

impl TaskDraft {
    /// Builds a draft from already-converted second values.
    pub fn new(
        name: impl Into<String>,
        min_time: Option<u64>,
        max_time: Option<u64>,
    ) -> Result<Self, TaskValidationError> {
        let draft = Self {
            name: name.into(),
            min_time,
            max_time,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Draft for a task without thresholds.
    pub fn no_timer(name: impl Into<String>) -> Result<Self, TaskValidationError> {
        Self::new(name, None, None)
    }

    /// Parses raw creation-form input.
    ///
    /// Minute fields are trimmed; blank means "not set". `no_timer` discards
    /// both minute fields without parsing them.
    pub fn from_form(
        name: &str,
        min_minutes: &str,
        max_minutes: &str,
        no_timer: bool,
    ) -> Result<Self, TaskValidationError> {
        if no_timer {
            return Self::no_timer(name);
        }
        let min_time = parse_minutes(ThresholdField::Min, min_minutes)?;
        let max_time = parse_minutes(ThresholdField::Max, max_minutes)?;
        Self::new(name, min_time, max_time)
    }

    /// Checks draft invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::EmptyName);
        }
        for (field, value) in [
            (ThresholdField::Min, self.min_time),
            (ThresholdField::Max, self.max_time),
        ] {
            if let Some(seconds) = value {
                if seconds > MAX_STORED_SECONDS {
                    return Err(TaskValidationError::OutOfRange {
                        field,
                        value: seconds.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Which threshold a form value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdField {
    Min,
    Max,
}

impl Display for ThresholdField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Min => write!(f, "minimum time"),
            Self::Max => write!(f, "maximum time"),
        }
    }
}

/// Task input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyName,
    NotANumber { field: ThresholdField, value: String },
    Negative { field: ThresholdField, value: i64 },
    /// The value does not fit in storage once converted to seconds.
    OutOfRange { field: ThresholdField, value: String },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name cannot be empty"),
            Self::NotANumber { field, value } => {
                write!(f, "{field} must be a whole number of minutes, got `{value}`")
            }
            Self::Negative { field, value } => {
                write!(f, "{field} cannot be negative, got {value}")
            }
            Self::OutOfRange { field, value } => write!(f, "{field} is too large, got {value}"),
        }
    }
}

impl Error for TaskValidationError {}

fn parse_minutes(field: ThresholdField, raw: &str) -> Result<Option<u64>, TaskValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let minutes = trimmed
        .parse::<i64>()
        .map_err(|_| TaskValidationError::NotANumber {
            field,
            value: trimmed.to_string(),
        })?;
    if minutes < 0 {
        return Err(TaskValidationError::Negative {
            field,
            value: minutes,
        });
    }
    u64::try_from(minutes)
        .ok()
        .and_then(|minutes| minutes.checked_mul(SECONDS_PER_MINUTE))
        .filter(|seconds| *seconds <= MAX_STORED_SECONDS)
        .map(Some)
        .ok_or_else(|| TaskValidationError::OutOfRange {
            field,
            value: trimmed.to_string(),
        })
}

/// Formats seconds as `HH:MM:SS`.
pub fn format_hms(total_seconds: u64) -> String {
    let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
