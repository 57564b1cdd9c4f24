//! Notifications emitted to the UI shell.

use crate::model::task::TaskId;
use serde::Serialize;
use std::sync::mpsc::Sender;

/// Why a session reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit stop, e.g. the timer view was closed.
    User,
    /// Maximum threshold reached.
    MaximumReached,
    /// The task was deleted while its session was live.
    TaskRemoved,
}

/// State change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    SessionStarted {
        task_id: TaskId,
        elapsed: u64,
        display: String,
    },
    /// Counter changed, by a tick or a manual adjustment. `display` is
    /// `HH:MM:SS`.
    Tick {
        task_id: TaskId,
        elapsed: u64,
        display: String,
    },
    PauseChanged {
        task_id: TaskId,
        paused: bool,
    },
    MinimumReached {
        task_id: TaskId,
        name: String,
        min_time: u64,
    },
    /// Time's up. Always followed by `SessionStopped`.
    MaximumReached {
        task_id: TaskId,
        name: String,
        max_time: u64,
    },
    SessionStopped {
        task_id: TaskId,
        elapsed: u64,
        completed: bool,
        reason: StopReason,
    },
    DailyResetCompleted {
        task_count: usize,
    },
}

/// Subscriber for [`TimerEvent`]s.
///
/// Called from the ticker and scheduler threads with no core locks held, so
/// implementations may call back into the facade.
pub trait TimerObserver: Send + Sync {
    fn on_event(&self, event: &TimerEvent);
}

impl<F> TimerObserver for F
where
    F: Fn(&TimerEvent) + Send + Sync,
{
    fn on_event(&self, event: &TimerEvent) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TimerObserver for NoopObserver {
    fn on_event(&self, _event: &TimerEvent) {}
}

/// Forwards events into an `mpsc` channel.
///
/// A disconnected receiver is ignored.
pub struct ChannelObserver {
    tx: Sender<TimerEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<TimerEvent>) -> Self {
        Self { tx }
    }
}

impl TimerObserver for ChannelObserver {
    fn on_event(&self, event: &TimerEvent) {
        let _ = self.tx.send(event.clone());
    }
}
