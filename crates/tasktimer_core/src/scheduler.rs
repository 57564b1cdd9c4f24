//! Daily reset scheduling.
//!
//! # Responsibility
//! - Compute the next wall-clock occurrence of the reset time.
//! - Run a cancellable background thread that fires the reset handler once
//!   per day and re-arms itself.
//!
//! # Invariants
//! - The computed fire time is strictly after `now`.
//! - A DST gap swallowing the reset time moves it to the first valid instant
//!   one hour later; an ambiguous (repeated) hour uses the earlier instant.
//! - The thread never sleeps longer than `MAX_SLEEP`, so suspend/resume or a
//!   clock change is picked up within that bound.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, TimeZone};
use log::info;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const SCHEDULER_THREAD_NAME: &str = "tasktimer-reset";
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Returns the default reset time, 02:00.
pub fn default_reset_time() -> NaiveTime {
    NaiveTime::from_hms_opt(2, 0, 0).unwrap_or_default()
}

/// Next occurrence of `at` strictly after `now`, in `now`'s time zone.
///
/// Before `at` today the result is today; at or after `at` it is tomorrow.
pub fn next_reset_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = resolve_local(&tz, day.and_time(at)) {
            if candidate > *now {
                return candidate;
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    now.clone() + ChronoDuration::days(1)
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + ChronoDuration::hours(1))).earliest())
}

/// Work performed when the reset fires.
pub trait DailyResetHandler: Send + Sync {
    fn on_daily_reset(&self);
}

impl<F> DailyResetHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_daily_reset(&self) {
        self()
    }
}

/// Wall-clock source; replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Handle to the reset thread. Dropping it stops and joins the thread.
pub struct DailyResetScheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl DailyResetScheduler {
    /// Starts the reset loop using the system clock.
    pub fn spawn(handler: Arc<dyn DailyResetHandler>, at: NaiveTime) -> std::io::Result<Self> {
        Self::spawn_with_clock(handler, at, Arc::new(SystemClock))
    }

    pub fn spawn_with_clock(
        handler: Arc<dyn DailyResetHandler>,
        at: NaiveTime,
        clock: Arc<dyn Clock>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(SCHEDULER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut fire_at = next_reset_after(&clock.now(), at);
                info!("event=reset_scheduled module=scheduler status=ok fire_at={fire_at}");
                loop {
                    let now = clock.now();
                    if now >= fire_at {
                        handler.on_daily_reset();
                        fire_at = next_reset_after(&now, at);
                        info!(
                            "event=reset_scheduled module=scheduler status=ok fire_at={fire_at}"
                        );
                        continue;
                    }

                    let wait = (fire_at - now)
                        .to_std()
                        .unwrap_or(Duration::ZERO)
                        .min(MAX_SLEEP);
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signals the thread and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for DailyResetScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
