use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tasktimer_core::db::open_db_in_memory;
use tasktimer_core::{
    ChannelObserver, SessionState, SqliteTaskStore, StopReason, TaskDraft, TaskRegistry,
    TaskStore, TaskTimer, TimerError, TimerEvent, TimerObserver, TimerSettings,
};

type Timer = TaskTimer<SqliteTaskStore>;

const FROZEN: Duration = Duration::from_secs(3600);
const FAST: Duration = Duration::from_millis(5);
const WAIT: Duration = Duration::from_secs(5);

fn settings(tick_interval: Duration) -> TimerSettings {
    TimerSettings {
        tick_interval,
        adjust_step_secs: 60,
        reset_time: None,
    }
}

fn registry() -> Arc<TaskRegistry<SqliteTaskStore>> {
    Arc::new(TaskRegistry::open(SqliteTaskStore::new(open_db_in_memory().unwrap())).unwrap())
}

fn timer(tick_interval: Duration) -> (Timer, Receiver<TimerEvent>) {
    let (tx, rx) = mpsc::channel();
    let timer = TaskTimer::new(
        registry(),
        Arc::new(ChannelObserver::new(tx)),
        settings(tick_interval),
    )
    .unwrap();
    (timer, rx)
}

fn drain(rx: &Receiver<TimerEvent>) -> Vec<TimerEvent> {
    rx.try_iter().collect()
}

fn wait_for_stop(rx: &Receiver<TimerEvent>) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.recv_timeout(WAIT) {
        let stopped = matches!(event, TimerEvent::SessionStopped { .. });
        events.push(event);
        if stopped {
            return events;
        }
    }
    panic!("session did not stop; saw {events:?}");
}

#[test]
fn second_start_is_rejected_and_leaves_live_session_untouched() {
    let (timer, _rx) = timer(FROZEN);
    let first = timer.add_task(&TaskDraft::no_timer("first").unwrap()).unwrap();
    timer.add_task(&TaskDraft::no_timer("second").unwrap()).unwrap();

    timer.start_session("first").unwrap();
    timer.add_time().unwrap();

    let err = timer.start_session("second").unwrap_err();
    assert!(matches!(err, TimerError::AlreadyRunning { task_id } if task_id == first.id));
    let err = timer.start_session("first").unwrap_err();
    assert!(matches!(err, TimerError::AlreadyRunning { .. }));

    let active = timer.active_session().unwrap();
    assert_eq!(active.task_id, first.id);
    assert_eq!(active.elapsed, 60);
    assert_eq!(active.state, SessionState::Running);
}

#[test]
fn controls_without_a_session_report_no_active_session() {
    let (timer, _rx) = timer(FROZEN);

    assert_eq!(timer.session_state(), SessionState::Idle);
    assert!(matches!(timer.pause(), Err(TimerError::NoActiveSession)));
    assert!(matches!(timer.add_time(), Err(TimerError::NoActiveSession)));
    assert!(matches!(
        timer.stop_session(),
        Err(TimerError::NoActiveSession)
    ));
}

#[test]
fn unknown_targets_are_not_found() {
    let (timer, _rx) = timer(FROZEN);

    assert!(matches!(
        timer.start_session("nope"),
        Err(TimerError::NameNotFound(name)) if name == "nope"
    ));
    assert!(matches!(
        timer.start_session_by_id(77),
        Err(TimerError::NotFound(77))
    ));
    assert!(matches!(timer.remove_task(77), Err(TimerError::NotFound(77))));
}

#[test]
fn pause_resume_and_adjustments_are_persisted_and_notified() {
    let (timer, rx) = timer(FROZEN);
    let task = timer.add_task(&TaskDraft::no_timer("focus").unwrap()).unwrap();

    timer.start_session_by_id(task.id).unwrap();
    timer.add_time().unwrap();
    timer.add_time().unwrap();
    assert_eq!(timer.registry().get(task.id).unwrap().elapsed, 120);

    assert_eq!(timer.pause().unwrap().state, SessionState::Paused);
    assert_eq!(timer.remove_time().unwrap().elapsed, 60);
    assert_eq!(timer.toggle_pause().unwrap().state, SessionState::Running);

    let stopped = timer.stop_session().unwrap();
    assert_eq!(stopped.state, SessionState::Finished);
    assert_eq!(stopped.elapsed, 60);
    assert_eq!(timer.session_state(), SessionState::Idle);

    let stored = timer
        .registry()
        .with_store(|store| store.get(task.id).unwrap())
        .unwrap();
    assert_eq!(stored.elapsed, 60);

    let events = drain(&rx);
    assert!(matches!(
        events.as_slice(),
        [
            TimerEvent::SessionStarted { elapsed: 0, .. },
            TimerEvent::Tick { elapsed: 60, .. },
            TimerEvent::Tick { elapsed: 120, .. },
            TimerEvent::PauseChanged { paused: true, .. },
            TimerEvent::Tick { elapsed: 60, .. },
            TimerEvent::PauseChanged { paused: false, .. },
            TimerEvent::SessionStopped {
                elapsed: 60,
                reason: StopReason::User,
                ..
            },
        ]
    ));
}

#[test]
fn ticking_reaches_maximum_and_frees_the_slot() {
    let (timer, rx) = timer(FAST);
    let task = timer
        .add_task(&TaskDraft::new("sprint", Some(2), Some(4)).unwrap())
        .unwrap();
    timer.add_task(&TaskDraft::no_timer("next").unwrap()).unwrap();

    timer.start_session("sprint").unwrap();
    let events = wait_for_stop(&rx);

    let min_at = events
        .iter()
        .position(|event| matches!(event, TimerEvent::MinimumReached { .. }))
        .unwrap();
    let max_at = events
        .iter()
        .position(|event| matches!(event, TimerEvent::MaximumReached { max_time: 4, .. }))
        .unwrap();
    assert!(min_at < max_at);
    assert!(matches!(
        events.last(),
        Some(TimerEvent::SessionStopped {
            elapsed: 4,
            completed: true,
            reason: StopReason::MaximumReached,
            ..
        })
    ));

    assert_eq!(timer.session_state(), SessionState::Finished);
    let stored = timer.registry().get(task.id).unwrap();
    assert_eq!(stored.elapsed, 4);
    assert!(stored.completed);

    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(timer.registry().get(task.id).unwrap().elapsed, 4);

    timer.start_session("next").unwrap();
    assert_eq!(timer.session_state(), SessionState::Running);
    timer.stop_session().unwrap();
}

#[test]
fn stop_halts_ticking_and_writes_final_state() {
    let (timer, _rx) = timer(FAST);
    let task = timer.add_task(&TaskDraft::no_timer("open").unwrap()).unwrap();

    timer.start_session("open").unwrap();
    std::thread::sleep(Duration::from_millis(60));
    let stopped = timer.stop_session().unwrap();

    std::thread::sleep(Duration::from_millis(30));
    let stored = timer
        .registry()
        .with_store(|store| store.get(task.id).unwrap())
        .unwrap();
    assert_eq!(stored.elapsed, stopped.elapsed);
    assert_eq!(timer.registry().get(task.id).unwrap().elapsed, stopped.elapsed);
}

#[test]
fn removing_the_running_task_stops_its_session() {
    let (timer, rx) = timer(FROZEN);
    let task = timer.add_task(&TaskDraft::no_timer("doomed").unwrap()).unwrap();
    timer.start_session("doomed").unwrap();

    let removed = timer.remove_task(task.id).unwrap();
    assert_eq!(removed.id, task.id);
    assert_eq!(timer.session_state(), SessionState::Idle);
    assert!(timer.list_tasks().is_empty());

    let events = drain(&rx);
    assert!(matches!(
        events.last(),
        Some(TimerEvent::SessionStopped {
            reason: StopReason::TaskRemoved,
            ..
        })
    ));
}

#[test]
fn reset_now_zeroes_registry_store_and_live_counter() {
    let (timer, rx) = timer(FROZEN);
    let running = timer
        .add_task(&TaskDraft::new("running", Some(60), None).unwrap())
        .unwrap();
    let idle = timer.add_task(&TaskDraft::no_timer("idle").unwrap()).unwrap();
    timer.registry().apply(idle.id, 500, false).unwrap();

    timer.start_session("running").unwrap();
    timer.add_time().unwrap();

    assert_eq!(timer.reset_now().unwrap(), 2);
    assert_eq!(timer.active_session().unwrap().elapsed, 0);
    assert!(timer.list_tasks().iter().all(|task| task.elapsed == 0));
    let stored = timer
        .registry()
        .with_store(|store| store.list_all().unwrap());
    assert!(stored.iter().all(|task| task.elapsed == 0));

    assert!(drain(&rx)
        .iter()
        .any(|event| matches!(event, TimerEvent::DailyResetCompleted { task_count: 2 })));

    timer.stop_session().unwrap();
    assert_eq!(timer.registry().get(running.id).unwrap().elapsed, 0);
}

#[test]
fn reset_during_live_ticking_is_never_overwritten_by_stale_ticks() {
    let (timer, _rx) = timer(FAST);
    let task = timer.add_task(&TaskDraft::no_timer("busy").unwrap()).unwrap();
    timer.start_session("busy").unwrap();
    timer.add_time().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    assert!(timer.registry().get(task.id).unwrap().elapsed >= 60);

    timer.reset_now().unwrap();

    for _ in 0..20 {
        let stored = timer
            .registry()
            .with_store(|store| store.get(task.id).unwrap().unwrap())
            .elapsed;
        let live = timer.active_session().unwrap().elapsed;
        assert!(stored < 60, "stale pre-reset value {stored} came back");
        assert!(stored <= live, "stored {stored} ahead of live counter {live}");
        std::thread::sleep(Duration::from_millis(5));
    }

    let stopped = timer.stop_session().unwrap();
    assert!(stopped.elapsed < 60);
    assert_eq!(timer.registry().get(task.id).unwrap().elapsed, stopped.elapsed);
}

struct StopOnTimesUp {
    timer: OnceLock<Weak<Timer>>,
    done: mpsc::Sender<bool>,
}

impl TimerObserver for StopOnTimesUp {
    fn on_event(&self, event: &TimerEvent) {
        if let TimerEvent::MaximumReached { .. } = event {
            if let Some(timer) = self.timer.get().and_then(Weak::upgrade) {
                let _ = self.done.send(timer.stop_session().is_ok());
            }
        }
    }
}

#[test]
fn observer_may_call_back_into_the_facade_from_the_ticker() {
    let (done_tx, done_rx) = mpsc::channel();
    let observer = Arc::new(StopOnTimesUp {
        timer: OnceLock::new(),
        done: done_tx,
    });
    let timer = Arc::new(
        TaskTimer::new(
            registry(),
            Arc::clone(&observer) as Arc<dyn TimerObserver>,
            settings(FAST),
        )
        .unwrap(),
    );
    let _ = observer.timer.set(Arc::downgrade(&timer));

    timer
        .add_task(&TaskDraft::new("short", None, Some(2)).unwrap())
        .unwrap();
    timer.start_session("short").unwrap();

    assert!(done_rx.recv_timeout(WAIT).unwrap());
    assert_eq!(timer.session_state(), SessionState::Idle);
}
