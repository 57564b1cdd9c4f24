//! In-memory task registry mirroring the durable store.
//!
//! # Responsibility
//! - Serve reads (snapshot, lookup by ID or name) without touching SQLite.
//! - Route every write through the store and keep the mirror in step.
//! - Emit the task lifecycle log events (`task_create`, `task_remove`,
//!   `daily_reset`).
//!
//! # Invariants
//! - One mutex guards the store and the mirror together; it is held only for
//!   a single read-modify-write.
//! - Mirror order equals store order (ascending ID).
//! - `reset_all` zeroes elapsed time only; completion flags survive.

use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repo::task_repo::TaskStore;
use crate::service::error::{TimerError, TimerResult};
use crate::session::ProgressSink;
use log::{error, info};
use std::sync::{Mutex, MutexGuard, PoisonError};

struct RegistryState<S> {
    store: S,
    tasks: Vec<Task>,
}

/// Read-optimized mirror of the task store.
pub struct TaskRegistry<S: TaskStore> {
    state: Mutex<RegistryState<S>>,
}

impl<S: TaskStore> TaskRegistry<S> {
    /// Creates an empty registry over `store`. Call [`TaskRegistry::load`]
    /// before serving reads.
    pub fn new(store: S) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                store,
                tasks: Vec::new(),
            }),
        }
    }

    /// Creates a registry and loads the current store contents.
    pub fn open(store: S) -> TimerResult<Self> {
        let registry = Self::new(store);
        registry.load()?;
        Ok(registry)
    }

    /// Replaces the mirror with a fresh store snapshot.
    pub fn load(&self) -> TimerResult<usize> {
        let mut state = self.lock();
        let tasks = state.store.list_all()?;
        let count = tasks.len();
        state.tasks = tasks;
        info!("event=registry_load module=registry status=ok task_count={count}");
        Ok(count)
    }

    /// Persists a new task and adds it to the mirror.
    pub fn add(&self, draft: &TaskDraft) -> TimerResult<Task> {
        draft.validate()?;

        let mut state = self.lock();
        let id = state
            .store
            .create(draft.name.as_str(), draft.min_time, draft.max_time)?;
        let task = Task {
            id,
            name: draft.name.clone(),
            min_time: draft.min_time,
            max_time: draft.max_time,
            elapsed: 0,
            completed: false,
        };
        state.tasks.push(task.clone());

        info!(
            "event=task_create module=registry status=ok task_id={} name={:?} min_time={} max_time={}",
            id,
            task.name,
            fmt_threshold(task.min_time),
            fmt_threshold(task.max_time)
        );
        Ok(task)
    }

    /// Deletes a task from the store and the mirror.
    pub fn remove(&self, id: TaskId) -> TimerResult<Task> {
        let mut state = self.lock();
        let index = state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(TimerError::NotFound(id))?;

        if let Err(err) = state.store.delete(id) {
            error!(
                "event=task_remove module=registry status=error task_id={id} error={err}"
            );
            return Err(err.into());
        }
        let removed = state.tasks.remove(index);

        info!(
            "event=task_remove module=registry status=ok task_id={} name={:?}",
            removed.id, removed.name
        );
        Ok(removed)
    }

    /// Returns the first task with `name`, by insertion order.
    pub fn find(&self, name: &str) -> Option<Task> {
        self.lock()
            .tasks
            .iter()
            .find(|task| task.name == name)
            .cloned()
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Ordered copy of every task for rendering.
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes progress to the mirror and flushes it to the store.
    ///
    /// The mirror is updated even when the store write fails, so readers see
    /// the live counter; the caller decides whether the failure is fatal.
    pub fn apply(&self, id: TaskId, elapsed: u64, completed: bool) -> TimerResult<()> {
        let mut state = self.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(TimerError::NotFound(id))?;
        task.elapsed = elapsed;
        task.completed = completed;

        state.store.update(id, elapsed, completed)?;
        Ok(())
    }

    /// Zeroes elapsed time for every task.
    pub fn reset_all(&self) -> TimerResult<usize> {
        let mut state = self.lock();
        if let Err(err) = state.store.reset_all_elapsed() {
            error!("event=daily_reset module=registry status=error error={err}");
            return Err(err.into());
        }

        for task in state.tasks.iter_mut() {
            task.elapsed = 0;
            info!(
                "event=daily_reset module=registry status=ok task_id={} name={:?}",
                task.id, task.name
            );
        }
        let count = state.tasks.len();
        info!("event=daily_reset module=registry status=done task_count={count}");
        Ok(count)
    }

    /// Runs `f` against the store under the registry lock.
    ///
    /// Intended for diagnostics and tests that compare mirror and store.
    pub fn with_store<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.lock().store)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: TaskStore + Send> ProgressSink for TaskRegistry<S> {
    fn apply_progress(&self, id: TaskId, elapsed: u64, completed: bool) -> TimerResult<()> {
        self.apply(id, elapsed, completed)
    }
}

fn fmt_threshold(value: Option<u64>) -> String {
    value.map_or_else(|| "none".to_string(), |seconds| seconds.to_string())
}
