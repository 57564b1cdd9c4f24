//! Core domain logic for the task timer.
//!
//! Tasks with optional minimum/maximum duration targets, one running timer
//! session at a time, durable progress in SQLite, and a daily reset. UI
//! shells drive everything through [`TaskTimer`] and listen through
//! [`TimerObserver`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scheduler;
pub mod service;
pub mod session;

pub use config::{ConfigError, TimerConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::task::{format_hms, Task, TaskDraft, TaskId, TaskValidationError, ThresholdField};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskStore, TaskStore};
pub use scheduler::{next_reset_after, DailyResetHandler, DailyResetScheduler};
pub use service::error::{TimerError, TimerResult};
pub use service::registry::TaskRegistry;
pub use service::timer_service::{StartupError, TaskTimer, TimerSettings};
pub use session::{
    ChannelObserver, NoopObserver, ProgressSink, SessionSnapshot, SessionState, StopReason,
    TimerEvent, TimerObserver, TimerSession,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
