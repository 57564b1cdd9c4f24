//! UI-shell facade over registry, timer session and daily reset.
//!
//! # Responsibility
//! - Expose the intents a UI shell forwards: task CRUD and session controls.
//! - Hold the single active session slot and its ticker thread.
//! - Own the daily reset scheduler and serialize resets against ticks.
//!
//! # Invariants
//! - At most one session is `Running`/`Paused`; a second start fails with
//!   `AlreadyRunning` and leaves the live session untouched.
//! - Lock order is active slot, then session, then registry. The active slot
//!   is never locked while a session lock is held.
//! - Observers are notified after every core lock is released.

use crate::config::{ConfigError, TimerConfig};
use crate::db::{open_db, DbError};
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::repo::task_repo::{SqliteTaskStore, TaskStore};
use crate::scheduler::{default_reset_time, DailyResetHandler, DailyResetScheduler};
use crate::service::error::{TimerError, TimerResult};
use crate::service::registry::TaskRegistry;
use crate::session::state::DEFAULT_ADJUST_STEP_SECS;
use crate::session::{
    ProgressSink, SessionSnapshot, SessionState, Ticker, TimerEvent, TimerObserver, TimerSession,
};
use chrono::NaiveTime;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Runtime knobs for sessions and the reset scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub tick_interval: Duration,
    pub adjust_step_secs: u64,
    /// `None` disables the background daily reset.
    pub reset_time: Option<NaiveTime>,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            adjust_step_secs: DEFAULT_ADJUST_STEP_SECS,
            reset_time: Some(default_reset_time()),
        }
    }
}

impl TimerSettings {
    pub fn from_config(config: &TimerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tick_interval: config.tick_interval(),
            adjust_step_secs: config.adjust_step_secs,
            reset_time: Some(config.reset_time()?),
        })
    }
}

/// Failure while assembling a [`TaskTimer`] from configuration.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Db(DbError),
    Timer(TimerError),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "failed to open task database: {err}"),
            Self::Timer(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Timer(err) => Some(err),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for StartupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<TimerError> for StartupError {
    fn from(value: TimerError) -> Self {
        Self::Timer(value)
    }
}

struct ActiveRun {
    session: Arc<Mutex<TimerSession>>,
    ticker: Option<Ticker>,
}

impl ActiveRun {
    fn task_id(&self) -> TaskId {
        lock(&self.session).task_id()
    }

    fn is_live(&self) -> bool {
        lock(&self.session).is_live()
    }

    /// Stops and joins the ticker; the session itself is left as is.
    fn halt_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

struct Shared<S: TaskStore> {
    registry: Arc<TaskRegistry<S>>,
    active: Mutex<Option<ActiveRun>>,
    observer: Arc<dyn TimerObserver>,
    settings: TimerSettings,
}

impl<S: TaskStore + Send + 'static> Shared<S> {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: Option<TimerEvent>) {
        if let Some(event) = event {
            self.observer.on_event(&event);
        }
    }

    fn current_session(&self) -> Option<Arc<Mutex<TimerSession>>> {
        self.lock_active()
            .as_ref()
            .map(|run| Arc::clone(&run.session))
    }

    /// Runs one control operation against the live session.
    fn control(
        &self,
        op: impl FnOnce(&mut TimerSession, &dyn ProgressSink) -> Option<TimerEvent>,
    ) -> TimerResult<SessionSnapshot> {
        let session = self.current_session().ok_or(TimerError::NoActiveSession)?;
        let (event, snapshot) = {
            let mut session = lock(&session);
            if !session.is_live() {
                return Err(TimerError::NoActiveSession);
            }
            let event = op(&mut *session, self.registry.as_ref());
            (event, session.snapshot())
        };
        self.notify(event);
        Ok(snapshot)
    }

    /// Holds the active slot for the whole reset so no session can start
    /// from pre-reset values while the store is being zeroed.
    fn daily_reset(&self) -> TimerResult<usize> {
        let count = {
            let active = self.lock_active();
            let mut session = active.as_ref().map(|run| lock(&run.session));
            let count = self.registry.reset_all()?;
            if let Some(session) = session.as_mut() {
                session.reset_elapsed();
            }
            count
        };
        self.notify(Some(TimerEvent::DailyResetCompleted { task_count: count }));
        Ok(count)
    }
}

impl<S: TaskStore + Send + 'static> DailyResetHandler for Shared<S> {
    fn on_daily_reset(&self) {
        if let Err(err) = self.daily_reset() {
            error!("event=daily_reset module=timer_service status=error error={err}");
        }
    }
}

/// Entry point for UI shells.
pub struct TaskTimer<S: TaskStore + Send + 'static> {
    shared: Arc<Shared<S>>,
    scheduler: Mutex<Option<DailyResetScheduler>>,
}

impl TaskTimer<SqliteTaskStore> {
    /// Opens the configured database, loads the registry and starts the
    /// daily reset scheduler.
    pub fn open(
        config: &TimerConfig,
        observer: Arc<dyn TimerObserver>,
    ) -> Result<Self, StartupError> {
        let settings = TimerSettings::from_config(config)?;
        config.ensure_dirs()?;
        let store = SqliteTaskStore::new(open_db(&config.db_path)?);
        let registry = Arc::new(TaskRegistry::open(store)?);
        Ok(Self::new(registry, observer, settings)?)
    }
}

impl<S: TaskStore + Send + 'static> TaskTimer<S> {
    /// Builds the facade over an already loaded registry.
    pub fn new(
        registry: Arc<TaskRegistry<S>>,
        observer: Arc<dyn TimerObserver>,
        settings: TimerSettings,
    ) -> TimerResult<Self> {
        let reset_time = settings.reset_time;
        let shared = Arc::new(Shared {
            registry,
            active: Mutex::new(None),
            observer,
            settings,
        });

        let scheduler = match reset_time {
            Some(at) => Some(
                DailyResetScheduler::spawn(Arc::clone(&shared) as Arc<dyn DailyResetHandler>, at)
                    .map_err(TimerError::Spawn)?,
            ),
            None => None,
        };

        Ok(Self {
            shared,
            scheduler: Mutex::new(scheduler),
        })
    }

    pub fn registry(&self) -> &Arc<TaskRegistry<S>> {
        &self.shared.registry
    }

    pub fn add_task(&self, draft: &TaskDraft) -> TimerResult<Task> {
        self.shared.registry.add(draft)
    }

    /// Deletes a task. A live session on that task is finished first,
    /// without a final write.
    pub fn remove_task(&self, id: TaskId) -> TimerResult<Task> {
        if self.shared.registry.get(id).is_none() {
            return Err(TimerError::NotFound(id));
        }

        let run = {
            let mut active = self.shared.lock_active();
            match active.as_ref() {
                Some(run) if run.task_id() == id => active.take(),
                _ => None,
            }
        };
        if let Some(mut run) = run {
            run.halt_ticker();
            let event = lock(&run.session).abandon();
            self.shared.notify(event);
        }

        self.shared.registry.remove(id)
    }

    /// Ordered snapshot of every task.
    pub fn list_tasks(&self) -> Vec<Task> {
        self.shared.registry.snapshot()
    }

    /// Starts the first task named `name`.
    pub fn start_session(&self, name: &str) -> TimerResult<SessionSnapshot> {
        let task = self
            .shared
            .registry
            .find(name)
            .ok_or_else(|| TimerError::NameNotFound(name.to_string()))?;
        self.start_session_by_id(task.id)
    }

    pub fn start_session_by_id(&self, id: TaskId) -> TimerResult<SessionSnapshot> {
        // A finished run may still own a ticker that is winding down; join it
        // with no locks held.
        let previous = {
            let mut active = self.shared.lock_active();
            if let Some(run) = active.as_ref() {
                if run.is_live() {
                    return Err(TimerError::AlreadyRunning {
                        task_id: run.task_id(),
                    });
                }
            }
            active.take()
        };
        drop(previous);

        let task = self
            .shared
            .registry
            .get(id)
            .ok_or(TimerError::NotFound(id))?;

        let (event, snapshot) = {
            let mut active = self.shared.lock_active();
            if let Some(run) = active.as_ref() {
                if run.is_live() {
                    return Err(TimerError::AlreadyRunning {
                        task_id: run.task_id(),
                    });
                }
            }

            let mut session =
                TimerSession::new(&task).with_adjust_step(self.shared.settings.adjust_step_secs);
            let event = session.start(self.shared.registry.as_ref())?;
            let snapshot = session.snapshot();
            let session = Arc::new(Mutex::new(session));
            let ticker = Ticker::spawn(
                Arc::clone(&session),
                Arc::clone(&self.shared.registry) as Arc<dyn ProgressSink>,
                Arc::clone(&self.shared.observer),
                self.shared.settings.tick_interval,
            )
            .map_err(TimerError::Spawn)?;

            *active = Some(ActiveRun {
                session,
                ticker: Some(ticker),
            });
            (event, snapshot)
        };

        self.shared.notify(event);
        Ok(snapshot)
    }

    pub fn pause(&self) -> TimerResult<SessionSnapshot> {
        self.shared.control(|session, _| session.pause())
    }

    pub fn resume(&self) -> TimerResult<SessionSnapshot> {
        self.shared.control(|session, _| session.resume())
    }

    pub fn toggle_pause(&self) -> TimerResult<SessionSnapshot> {
        self.shared.control(|session, _| session.toggle_pause())
    }

    pub fn add_time(&self) -> TimerResult<SessionSnapshot> {
        self.shared.control(|session, sink| session.add_time(sink))
    }

    pub fn remove_time(&self) -> TimerResult<SessionSnapshot> {
        self.shared.control(|session, sink| session.remove_time(sink))
    }

    /// Ends the current session and persists its final state.
    ///
    /// A session that already finished on its maximum is cleared without a
    /// second write.
    pub fn stop_session(&self) -> TimerResult<SessionSnapshot> {
        let mut run = self
            .shared
            .lock_active()
            .take()
            .ok_or(TimerError::NoActiveSession)?;
        run.halt_ticker();

        let (event, snapshot) = {
            let mut session = lock(&run.session);
            let event = session.stop(self.shared.registry.as_ref())?;
            (event, session.snapshot())
        };
        self.shared.notify(event);
        Ok(snapshot)
    }

    /// Snapshot of the current session, including a finished one that has
    /// not been cleared by `stop_session` or a new start.
    pub fn active_session(&self) -> Option<SessionSnapshot> {
        self.shared
            .current_session()
            .map(|session| lock(&session).snapshot())
    }

    pub fn session_state(&self) -> SessionState {
        self.active_session()
            .map_or(SessionState::Idle, |snapshot| snapshot.state)
    }

    /// Runs the daily reset immediately.
    pub fn reset_now(&self) -> TimerResult<usize> {
        self.shared.daily_reset()
    }

    /// Stops the live session (persisting it) and the reset scheduler.
    pub fn shutdown(&self) {
        if let Some(scheduler) = lock(&self.scheduler).take() {
            scheduler.stop();
        }
        match self.stop_session() {
            Ok(snapshot) => info!(
                "event=shutdown module=timer_service status=ok task_id={} elapsed={}",
                snapshot.task_id, snapshot.elapsed
            ),
            Err(TimerError::NoActiveSession) => {
                info!("event=shutdown module=timer_service status=ok")
            }
            Err(err) => error!("event=shutdown module=timer_service status=error error={err}"),
        }
    }
}

impl<S: TaskStore + Send + 'static> Drop for TaskTimer<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
