use log::{LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};
use tasktimer_core::db::open_db_in_memory;
use tasktimer_core::{SqliteTaskStore, TaskDraft, TaskRegistry, TimerSession};

struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.lines.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

fn install() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Captured lines containing every fragment in `needles`.
fn lines_with(needles: &[&str]) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| needles.iter().all(|needle| line.contains(needle)))
        .cloned()
        .collect()
}

fn registry() -> TaskRegistry<SqliteTaskStore> {
    TaskRegistry::open(SqliteTaskStore::new(open_db_in_memory().unwrap())).unwrap()
}

#[test]
fn task_creation_records_name_id_and_thresholds() {
    install();
    let registry = registry();
    let task = registry
        .add(&TaskDraft::new("log-create", Some(300), Some(1800)).unwrap())
        .unwrap();
    let no_timer = registry
        .add(&TaskDraft::no_timer("log-create-plain").unwrap())
        .unwrap();

    let id = format!("task_id={}", task.id);
    let lines = lines_with(&["event=task_create", "name=\"log-create\"", id.as_str()]);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("min_time=300"));
    assert!(lines[0].contains("max_time=1800"));

    let plain = lines_with(&["event=task_create", "name=\"log-create-plain\""]);
    assert_eq!(plain.len(), 1);
    assert!(plain[0].contains(&format!("task_id={}", no_timer.id)));
    assert!(plain[0].contains("min_time=none"));
}

#[test]
fn task_removal_records_name_and_id() {
    install();
    let registry = registry();
    let task = registry
        .add(&TaskDraft::no_timer("log-remove").unwrap())
        .unwrap();
    registry.remove(task.id).unwrap();

    let id = format!("task_id={}", task.id);
    let lines = lines_with(&["event=task_remove", "name=\"log-remove\"", id.as_str()]);
    assert_eq!(lines.len(), 1);
}

#[test]
fn threshold_crossings_record_threshold_values() {
    install();
    let registry = registry();
    let task = registry
        .add(&TaskDraft::new("log-thresholds", Some(2), Some(3)).unwrap())
        .unwrap();
    let mut session = TimerSession::new(&task);
    session.start(&registry).unwrap();
    for _ in 0..10 {
        session.tick(&registry);
    }

    let min = lines_with(&["event=min_reached", "name=\"log-thresholds\""]);
    assert_eq!(min.len(), 1);
    assert!(min[0].contains("min_time=2"));
    assert!(min[0].contains(&format!("task_id={}", task.id)));

    let max = lines_with(&["event=max_reached", "name=\"log-thresholds\""]);
    assert_eq!(max.len(), 1);
    assert!(max[0].contains("max_time=3"));
}

#[test]
fn daily_reset_records_each_task() {
    install();
    let registry = registry();
    registry
        .add(&TaskDraft::no_timer("log-reset-a").unwrap())
        .unwrap();
    registry
        .add(&TaskDraft::no_timer("log-reset-b").unwrap())
        .unwrap();

    registry.reset_all().unwrap();

    assert_eq!(
        lines_with(&["event=daily_reset", "name=\"log-reset-a\""]).len(),
        1
    );
    assert_eq!(
        lines_with(&["event=daily_reset", "name=\"log-reset-b\""]).len(),
        1
    );
    assert!(!lines_with(&["event=daily_reset", "status=done", "task_count=2"]).is_empty());
}
