//! Background thread driving a [`TimerSession`] once per interval.
//!
//! # Invariants
//! - The thread sleeps on a stop channel, so a stop request is observed
//!   within one interval and no tick runs after it.
//! - Session and sink locks are released before observers are notified.
//! - The thread exits on its own once the session leaves `Running`/`Paused`.

use super::events::TimerObserver;
use super::state::TimerSession;
use super::ProgressSink;
use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TICKER_THREAD_NAME: &str = "tasktimer-ticker";

/// Handle to a running ticker thread. Dropping it stops and joins the thread.
pub struct Ticker {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns the ticker for `session`.
    pub fn spawn(
        session: Arc<Mutex<TimerSession>>,
        sink: Arc<dyn ProgressSink>,
        observer: Arc<dyn TimerObserver>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(TICKER_THREAD_NAME.to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                let (events, live) = {
                    let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
                    let events = session.tick(sink.as_ref());
                    (events, session.is_live())
                };
                for event in &events {
                    observer.on_event(event);
                }
                if !live {
                    debug!("event=ticker_exit module=session status=ok reason=session_finished");
                    break;
                }
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Returns whether the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Signals the thread and waits for it.
    ///
    /// When called from the ticker thread itself (an observer reacting to an
    /// event) the join is skipped; the loop exits after the current callback.
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

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
