//! Timer session state machine.
//!
//! The session owns the live counter for one task. It does not sleep or spawn
//! threads; [`super::Ticker`] calls [`TimerSession::tick`] once per interval.
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |          |
//!            +--> Finished <--+
//! ```
//!
//! # Invariants
//! - `tick` only advances while `Running`, by exactly one second.
//! - The minimum check runs before the maximum check within one tick, and both
//!   run after the counter advanced and before progress is persisted.
//! - `Finished` is terminal; every control call on it is a no-op.
//! - Manual adjustments never drive the counter below zero.

use super::events::{StopReason, TimerEvent};
use super::ProgressSink;
use crate::model::task::{format_hms, Task, TaskId};
use crate::service::error::TimerResult;
use log::{info, warn};
use serde::Serialize;

/// Default manual adjustment applied by `add_time`/`remove_time`.
pub const DEFAULT_ADJUST_STEP_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub task_id: TaskId,
    pub name: String,
    pub state: SessionState,
    pub elapsed: u64,
    pub completed: bool,
    pub display: String,
}

/// One task run.
#[derive(Debug, Clone)]
pub struct TimerSession {
    task_id: TaskId,
    name: String,
    min_time: Option<u64>,
    max_time: Option<u64>,
    elapsed: u64,
    completed: bool,
    state: SessionState,
    adjust_step: u64,
}

impl TimerSession {
    /// Creates an idle session seeded from the task's persisted progress.
    pub fn new(task: &Task) -> Self {
        Self {
            task_id: task.id,
            name: task.name.clone(),
            min_time: task.min_time,
            max_time: task.max_time,
            elapsed: task.elapsed,
            completed: task.completed,
            state: SessionState::Idle,
            adjust_step: DEFAULT_ADJUST_STEP_SECS,
        }
    }

    /// Overrides the manual adjustment step (seconds).
    pub fn with_adjust_step(mut self, seconds: u64) -> Self {
        self.adjust_step = seconds;
        self
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Returns whether the session is `Running` or `Paused`.
    pub fn is_live(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            task_id: self.task_id,
            name: self.name.clone(),
            state: self.state,
            elapsed: self.elapsed,
            completed: self.completed,
            display: format_hms(self.elapsed),
        }
    }

    /// `Idle -> Running`. Persists the starting progress.
    ///
    /// Returns `None` when the session is not idle.
    pub fn start(&mut self, sink: &dyn ProgressSink) -> TimerResult<Option<TimerEvent>> {
        if self.state != SessionState::Idle {
            return Ok(None);
        }
        sink.apply_progress(self.task_id, self.elapsed, self.completed)?;
        self.state = SessionState::Running;

        info!(
            "event=session_start module=session status=ok task_id={} name={:?} elapsed={}",
            self.task_id, self.name, self.elapsed
        );
        Ok(Some(TimerEvent::SessionStarted {
            task_id: self.task_id,
            elapsed: self.elapsed,
            display: format_hms(self.elapsed),
        }))
    }

    /// `Running -> Paused`.
    pub fn pause(&mut self) -> Option<TimerEvent> {
        if self.state != SessionState::Running {
            return None;
        }
        self.state = SessionState::Paused;
        Some(self.pause_event())
    }

    /// `Paused -> Running`.
    pub fn resume(&mut self) -> Option<TimerEvent> {
        if self.state != SessionState::Paused {
            return None;
        }
        self.state = SessionState::Running;
        Some(self.pause_event())
    }

    /// Single pause/resume control.
    pub fn toggle_pause(&mut self) -> Option<TimerEvent> {
        match self.state {
            SessionState::Running => self.pause(),
            SessionState::Paused => self.resume(),
            SessionState::Idle | SessionState::Finished => None,
        }
    }

    /// Advances one logical second and evaluates thresholds.
    ///
    /// Events are returned in emission order: `Tick`, then `MinimumReached`
    /// if the flag was set on this tick, then `MaximumReached` and
    /// `SessionStopped` if the maximum halted the session. Storage failures
    /// are logged and do not stop the counter; the next tick rewrites the
    /// absolute values.
    pub fn tick(&mut self, sink: &dyn ProgressSink) -> Vec<TimerEvent> {
        if self.state != SessionState::Running {
            return Vec::new();
        }

        self.elapsed += 1;
        let mut events = vec![TimerEvent::Tick {
            task_id: self.task_id,
            elapsed: self.elapsed,
            display: format_hms(self.elapsed),
        }];

        if let Some(min_time) = self.min_time {
            if !self.completed && self.elapsed >= min_time {
                self.completed = true;
                info!(
                    "event=min_reached module=session status=ok task_id={} name={:?} min_time={} completed=true",
                    self.task_id, self.name, min_time
                );
                events.push(TimerEvent::MinimumReached {
                    task_id: self.task_id,
                    name: self.name.clone(),
                    min_time,
                });
            }
        }

        self.persist(sink, "tick_persist");

        if let Some(max_time) = self.max_time {
            if self.elapsed >= max_time {
                self.state = SessionState::Finished;
                info!(
                    "event=max_reached module=session status=ok task_id={} name={:?} max_time={}",
                    self.task_id, self.name, max_time
                );
                events.push(TimerEvent::MaximumReached {
                    task_id: self.task_id,
                    name: self.name.clone(),
                    max_time,
                });
                events.push(self.stopped_event(StopReason::MaximumReached));
            }
        }

        events
    }

    /// Adds one adjustment step to the counter and persists it.
    pub fn add_time(&mut self, sink: &dyn ProgressSink) -> Option<TimerEvent> {
        if !self.is_live() {
            return None;
        }
        self.elapsed = self.elapsed.saturating_add(self.adjust_step);
        self.persist(sink, "adjust_persist");
        Some(self.adjusted_event())
    }

    /// Removes one adjustment step from the counter, flooring at zero.
    pub fn remove_time(&mut self, sink: &dyn ProgressSink) -> Option<TimerEvent> {
        if !self.is_live() {
            return None;
        }
        self.elapsed = self.elapsed.saturating_sub(self.adjust_step);
        self.persist(sink, "adjust_persist");
        Some(self.adjusted_event())
    }

    /// `Running/Paused -> Finished` on explicit request. Persists final state.
    pub fn stop(&mut self, sink: &dyn ProgressSink) -> TimerResult<Option<TimerEvent>> {
        self.finish(StopReason::User, Some(sink))
    }

    /// Finishes without a final write, for a task whose row is being deleted.
    pub fn abandon(&mut self) -> Option<TimerEvent> {
        self.finish(StopReason::TaskRemoved, None).ok().flatten()
    }

    /// Zeroes the live counter after a daily reset already cleared the store.
    pub fn reset_elapsed(&mut self) {
        self.elapsed = 0;
    }

    fn finish(
        &mut self,
        reason: StopReason,
        sink: Option<&dyn ProgressSink>,
    ) -> TimerResult<Option<TimerEvent>> {
        if !self.is_live() {
            return Ok(None);
        }
        self.state = SessionState::Finished;
        if let Some(sink) = sink {
            sink.apply_progress(self.task_id, self.elapsed, self.completed)?;
        }
        Ok(Some(self.stopped_event(reason)))
    }

    fn persist(&self, sink: &dyn ProgressSink, event: &str) {
        if let Err(err) = sink.apply_progress(self.task_id, self.elapsed, self.completed) {
            warn!(
                "event={event} module=session status=error task_id={} elapsed={} error={err}",
                self.task_id, self.elapsed
            );
        }
    }

    fn pause_event(&self) -> TimerEvent {
        TimerEvent::PauseChanged {
            task_id: self.task_id,
            paused: self.state == SessionState::Paused,
        }
    }

    fn adjusted_event(&self) -> TimerEvent {
        TimerEvent::Tick {
            task_id: self.task_id,
            elapsed: self.elapsed,
            display: format_hms(self.elapsed),
        }
    }

    fn stopped_event(&self, reason: StopReason) -> TimerEvent {
        info!(
            "event=session_stop module=session status=ok task_id={} name={:?} elapsed={} completed={} reason={:?}",
            self.task_id, self.name, self.elapsed, self.completed, reason
        );
        TimerEvent::SessionStopped {
            task_id: self.task_id,
            elapsed: self.elapsed,
            completed: self.completed,
            reason,
        }
    }
}
