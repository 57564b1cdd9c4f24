//! Timer session state machine and its background ticker.
//!
//! # Responsibility
//! - Govern the lifecycle of one active task run (`state`).
//! - Drive it once per interval from a cancellable thread (`ticker`).
//! - Describe state changes to the UI shell (`events`).
//!
//! # Invariants
//! - Each tick advances exactly one logical second.
//! - Progress is written through [`ProgressSink`] before the matching event
//!   is handed to observers.

use crate::model::task::TaskId;
use crate::service::error::TimerResult;

pub mod events;
pub mod state;
pub mod ticker;

pub use events::{ChannelObserver, NoopObserver, StopReason, TimerEvent, TimerObserver};
pub use state::{SessionSnapshot, SessionState, TimerSession};
pub use ticker::Ticker;

/// Durable destination for session progress.
///
/// Implemented by the task registry; tests may substitute a recorder.
pub trait ProgressSink: Send + Sync {
    fn apply_progress(&self, id: TaskId, elapsed: u64, completed: bool) -> TimerResult<()>;
}
