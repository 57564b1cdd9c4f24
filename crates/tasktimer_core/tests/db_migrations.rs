use rusqlite::Connection;
use tasktimer_core::db::migrations::{self, latest_version};
use tasktimer_core::db::{open_db, open_db_in_memory, DbError};
use tasktimer_core::{SqliteTaskStore, TaskStore};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_eq!(
        column_names(&conn),
        vec![
            "id",
            "name",
            "min_time",
            "max_time",
            "elapsed_time",
            "checkmark"
        ]
    );
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let store = SqliteTaskStore::new(open_db(&path).unwrap());
    store.create("persisted", Some(60), None).unwrap();
    drop(store);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let tasks = SqliteTaskStore::new(conn).list_all().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "persisted");
}

#[test]
fn legacy_database_without_user_version_is_adopted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            min_time INTEGER,
            max_time INTEGER,
            elapsed_time INTEGER DEFAULT 0,
            checkmark INTEGER DEFAULT 0
        );
        INSERT INTO tasks (name, min_time, max_time, elapsed_time, checkmark)
        VALUES ('Write report', 300, 1800, 420, 1);",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());

    let tasks = SqliteTaskStore::new(conn).list_all().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].min_time, Some(300));
    assert_eq!(tasks[0].max_time, Some(1800));
    assert_eq!(tasks[0].elapsed, 420);
    assert!(tasks[0].completed);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(err.to_string().contains("schema v999"));
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    migrations::schema_version(conn).unwrap()
}

fn column_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn.prepare("PRAGMA table_info(tasks);").unwrap();
    stmt.query_map([], |row| row.get::<_, String>("name"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}
