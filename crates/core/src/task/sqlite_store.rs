//! SQLite-backed task store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CreateTaskRequest, Task, TaskError, TaskFilter, TaskInput, TaskState, TaskStore};

/// SQLite-backed task store.
///
/// A single connection behind a mutex makes every operation, including the
/// read-check-write in `update_state`, atomic per store instance.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Create a new SQLite task store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TaskError> {
        let conn = Connection::open(path).map_err(|e| TaskError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite task store (useful for testing).
    pub fn in_memory() -> Result<Self, TaskError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TaskError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TaskError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                created_by TEXT NOT NULL,
                input TEXT NOT NULL,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_created_by ON tasks(created_by);
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            "#,
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &TaskFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref state) = filter.state {
            // The state type lives in the "type" field of the state JSON
            conditions.push("json_extract(state, '$.type') = ?");
            params.push(Box::new(state.clone()));
        }

        if let Some(ref created_by) = filter.created_by {
            conditions.push("created_by = ?");
            params.push(Box::new(created_by.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let id: String = row.get(0)?;
        let created_at_str: String = row.get(1)?;
        let created_by: String = row.get(2)?;
        let input_json: String = row.get(3)?;
        let state_json: String = row.get(4)?;
        let updated_at_str: String = row.get(5)?;

        // Parse timestamps - use now if parsing fails (shouldn't happen with valid data)
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let state: TaskState = serde_json::from_str(&state_json).unwrap_or(TaskState::Pending);

        let input: TaskInput = serde_json::from_str(&input_json)
            .unwrap_or_else(|_| TaskInput::new(String::new()));

        Ok(Task {
            id,
            created_at,
            created_by,
            input,
            state,
            updated_at,
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Task>, TaskError> {
        let result = conn.query_row(
            "SELECT id, created_at, created_by, input, state, updated_at FROM tasks WHERE id = ?",
            params![id],
            Self::row_to_task,
        );

        match result {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TaskError::Database(e.to_string())),
        }
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, request: CreateTaskRequest) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let state = TaskState::Pending;

        let state_json =
            serde_json::to_string(&state).map_err(|e| TaskError::Database(e.to_string()))?;

        let input_json = serde_json::to_string(&request.input)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO tasks (id, created_at, created_by, input, state, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                now.to_rfc3339(),
                request.created_by,
                input_json,
                state_json,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            id,
            created_at: now,
            created_by: request.created_by,
            input: request.input,
            state,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Task>, TaskError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, TaskError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, created_at, created_by, input, state, updated_at FROM tasks {} ORDER BY created_at ASC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_task)
            .map_err(|e| TaskError::Database(e.to_string()))?;

        let mut tasks = Vec::new();
        for row_result in rows {
            let task = row_result.map_err(|e| TaskError::Database(e.to_string()))?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    fn count(&self, filter: &TaskFilter) -> Result<i64, TaskError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tasks {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(count)
    }

    fn update_state(&self, id: &str, new_state: TaskState) -> Result<Task, TaskError> {
        // Holding the connection lock across read-check-write makes the
        // transition atomic and terminal states immutable.
        let conn = self.conn.lock().unwrap();

        let current = Self::get_locked(&conn, id)?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        if current.state.is_terminal() {
            return Err(TaskError::InvalidTransition {
                task_id: id.to_string(),
                current_state: current.state.state_type().to_string(),
                requested: new_state.state_type().to_string(),
            });
        }

        let now = Utc::now();
        let state_json =
            serde_json::to_string(&new_state).map_err(|e| TaskError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE tasks SET state = ?, updated_at = ? WHERE id = ?",
            params![state_json, now.to_rfc3339(), id],
        )
        .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(Task {
            state: new_state,
            updated_at: now,
            ..current
        })
    }

    fn delete(&self, id: &str) -> Result<Task, TaskError> {
        let conn = self.conn.lock().unwrap();

        let task = Self::get_locked(&conn, id)?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        conn.execute("DELETE FROM tasks WHERE id = ?", params![id])
            .map_err(|e| TaskError::Database(e.to_string()))?;

        Ok(task)
    }
}
