//! Task store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/list over the `tasks` table.
//! - Convert between SQLite integer columns and the unsigned domain model.
//!
//! # Invariants
//! - IDs are assigned by SQLite `AUTOINCREMENT` and never reused.
//! - `list_all` orders by ascending ID (insertion order).
//! - `checkmark` is stored as `0`/`1`.

use crate::db::DbError;
use crate::model::task::{Task, TaskId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    name,
    min_time,
    max_time,
    elapsed_time,
    checkmark
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level error for task persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable task table.
///
/// Implementations are not required to be internally synchronized; the
/// registry serializes every call behind one lock.
pub trait TaskStore {
    fn create(&self, name: &str, min_time: Option<u64>, max_time: Option<u64>)
        -> RepoResult<TaskId>;
    fn delete(&self, id: TaskId) -> RepoResult<()>;
    fn update(&self, id: TaskId, elapsed: u64, completed: bool) -> RepoResult<()>;
    fn get(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_all(&self) -> RepoResult<Vec<Task>>;
    /// Zeroes `elapsed_time` on every row and returns the affected count.
    fn reset_all_elapsed(&self) -> RepoResult<usize>;
}

/// SQLite-backed task store owning its connection.
pub struct SqliteTaskStore {
    conn: Connection,
}

impl SqliteTaskStore {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(
        &self,
        name: &str,
        min_time: Option<u64>,
        max_time: Option<u64>,
    ) -> RepoResult<TaskId> {
        self.conn.execute(
            "INSERT INTO tasks (name, min_time, max_time) VALUES (?1, ?2, ?3);",
            params![
                name,
                min_time.map(seconds_to_db).transpose()?,
                max_time.map(seconds_to_db).transpose()?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn update(&self, id: TaskId, elapsed: u64, completed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                elapsed_time = ?1,
                checkmark = ?2
             WHERE id = ?3;",
            params![seconds_to_db(elapsed)?, bool_to_int(completed), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let raw = stmt.query_row([id], RawTaskRow::from_row).optional()?;
        raw.map(RawTaskRow::into_task).transpose()
    }

    fn list_all(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(RawTaskRow::from_row(row)?.into_task()?);
        }

        Ok(tasks)
    }

    fn reset_all_elapsed(&self) -> RepoResult<usize> {
        let changed = self.conn.execute("UPDATE tasks SET elapsed_time = 0;", [])?;
        Ok(changed)
    }
}

/// Column values as SQLite hands them back, before domain validation.
struct RawTaskRow {
    id: TaskId,
    name: String,
    min_time: Option<i64>,
    max_time: Option<i64>,
    elapsed_time: Option<i64>,
    checkmark: Option<i64>,
}

impl RawTaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            min_time: row.get("min_time")?,
            max_time: row.get("max_time")?,
            elapsed_time: row.get("elapsed_time")?,
            checkmark: row.get("checkmark")?,
        })
    }

    fn into_task(self) -> RepoResult<Task> {
        let id = self.id;
        let completed = match self.checkmark.unwrap_or(0) {
            0 => false,
            1 => true,
            other => {
                return Err(RepoError::InvalidData(format!(
                    "invalid checkmark value `{other}` for task {id}"
                )));
            }
        };

        Ok(Task {
            id,
            name: self.name,
            min_time: self
                .min_time
                .map(|value| seconds_from_db(id, "min_time", value))
                .transpose()?,
            max_time: self
                .max_time
                .map(|value| seconds_from_db(id, "max_time", value))
                .transpose()?,
            elapsed: seconds_from_db(id, "elapsed_time", self.elapsed_time.unwrap_or(0))?,
            completed,
        })
    }
}

fn seconds_to_db(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("seconds value {value} exceeds i64 range")))
}

fn seconds_from_db(id: TaskId, column: &str, value: i64) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("negative {column} value `{value}` for task {id}"))
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
