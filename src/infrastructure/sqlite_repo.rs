use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::{SqlitePoolOptions, SqliteRow}, Pool, QueryBuilder, Row, Sqlite};

use crate::domain::{
    clock::MonotonicClock,
    error::{TodoError, TodoResult},
    ordering::plan_reorder,
    repository::TodoRepository,
    todo::{NewTodo, Patch, Todo, TodoId, UpdateTodo},
};

const COLUMNS: &str = "id, title, description, due_date, completed, order_key, created_at, updated_at";

impl From<sqlx::Error> for TodoError {
    fn from(e: sqlx::Error) -> Self { TodoError::Storage(e.into()) }
}

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteTodoRepository {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        Self::connect_with(database_url, 5).await
    }

    pub async fn connect_with(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        // Each connection to sqlite::memory: is its own database, so keep exactly one alive.
        let options = if is_memory_url(database_url) {
            SqlitePoolOptions::new().max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };
        let pool = options.connect(database_url).await?;
        Ok(Self { pool: Arc::new(pool) })
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn init(&self) -> TodoResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                due_date INTEGER,
                completed INTEGER NOT NULL DEFAULT 0,
                order_key INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_todos_order ON todos (order_key)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos (completed)")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert(&self, input: NewTodo) -> TodoResult<Todo> {
        let now = input.now.timestamp_millis();
        let order: i64 = sqlx::query_scalar(
            "INSERT INTO todos (id, title, description, due_date, completed, order_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, (SELECT COALESCE(MAX(order_key), -1) + 1 FROM todos), ?5, ?5)
             RETURNING order_key",
        )
        .bind(input.id.to_string())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.due_date.map(|d| d.timestamp_millis()))
        .bind(now)
        .fetch_one(&*self.pool)
        .await?;
        Ok(input.into_todo(order))
    }

    async fn get(&self, id: &TodoId) -> TodoResult<Option<Todo>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await?;
        row.map(row_to_todo).transpose()
    }

    async fn list(&self) -> TodoResult<Vec<Todo>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM todos ORDER BY order_key, id"))
            .fetch_all(&*self.pool)
            .await?;
        rows.into_iter().map(row_to_todo).collect()
    }

    async fn patch(&self, id: &TodoId, input: UpdateTodo, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
        // Only the columns present in the patch are written, so a concurrent toggle is never clobbered.
        // MAX keeps updated_at moving forward when statements reach the database out of clock order.
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE todos SET updated_at = MAX(");
        qb.push_bind(clock.now().timestamp_millis());
        qb.push(", updated_at + 1)");
        if let Some(title) = input.title {
            qb.push(", title = ").push_bind(title);
        }
        match input.description {
            Patch::Unchanged => {}
            Patch::Clear => { qb.push(", description = NULL"); }
            Patch::Set(d) => { qb.push(", description = ").push_bind(d); }
        }
        match input.due_date {
            Patch::Unchanged => {}
            Patch::Clear => { qb.push(", due_date = NULL"); }
            Patch::Set(d) => { qb.push(", due_date = ").push_bind(d.timestamp_millis()); }
        }
        if let Some(completed) = input.completed {
            qb.push(", completed = ").push_bind(completed);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());
        qb.push(" RETURNING ").push(COLUMNS);
        let row = qb.build().fetch_optional(&*self.pool).await?;
        row.map(row_to_todo).transpose()
    }

    async fn toggle(&self, id: &TodoId, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
        let row = sqlx::query(&format!(
            "UPDATE todos SET completed = NOT completed, updated_at = MAX(?2, updated_at + 1) WHERE id = ?1 RETURNING {COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(clock.now().timestamp_millis())
        .fetch_optional(&*self.pool)
        .await?;
        row.map(row_to_todo).transpose()
    }

    async fn delete(&self, id: &TodoId) -> TodoResult<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id.to_string())
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reorder(&self, ids: &[TodoId], clock: &MonotonicClock) -> TodoResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        // Park every key on a unique negative value first. Writing up front takes the
        // database write lock for the rest of the transaction and keeps idx_todos_order
        // satisfied while keys move.
        sqlx::query("UPDATE todos SET order_key = -order_key - 1")
            .execute(&mut *tx)
            .await?;
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT id, -order_key - 1 FROM todos")
            .fetch_all(&mut *tx)
            .await?;
        let current = rows
            .into_iter()
            .map(|(id, order)| Ok((parse_id(&id)?, order)))
            .collect::<TodoResult<Vec<_>>>()?;
        let plan = plan_reorder(&current, ids)?;
        let now = clock.now();
        for r in &plan {
            sqlx::query("UPDATE todos SET order_key = ?2, updated_at = MAX(?3, updated_at + 1) WHERE id = ?1")
                .bind(r.id.to_string())
                .bind(r.order)
                .bind(now.timestamp_millis())
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("UPDATE todos SET order_key = -order_key - 1 WHERE order_key < 0")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_completed(&self) -> TodoResult<u64> {
        let result = sqlx::query("DELETE FROM todos WHERE completed = 1")
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn parse_id(s: &str) -> TodoResult<TodoId> {
    s.parse().map_err(|e| TodoError::Storage(anyhow!("corrupt todo id {s:?}: {e}")))
}

fn millis(ms: i64) -> TodoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| TodoError::Storage(anyhow!("timestamp out of range: {ms}")))
}

fn row_to_todo(row: SqliteRow) -> TodoResult<Todo> {
    let id: String = row.try_get("id")?;
    let due_date: Option<i64> = row.try_get("due_date")?;
    Ok(Todo {
        id: parse_id(&id)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_date: due_date.map(millis).transpose()?,
        completed: row.try_get("completed")?,
        order: row.try_get("order_key")?,
        created_at: millis(row.try_get("created_at")?)?,
        updated_at: millis(row.try_get("updated_at")?)?,
    })
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the database file and its parent directories for file-backed URLs.
pub fn prepare_sqlite_file(database_url: &str) -> anyhow::Result<()> {
    if is_memory_url(database_url) { return Ok(()); }
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        // On Windows, absolute paths may look like /C:/path; strip the leading slash
        let path = if cfg!(windows) && path.len() >= 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
            &path[1..]
        } else {
            path
        };
        use std::{fs, path::Path, fs::OpenOptions};
        let p = Path::new(path);
        if let Some(parent) = p.parent() { if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; } }
        if !p.exists() {
            let _ = OpenOptions::new().create(true).append(true).open(p)?;
        }
    }
    Ok(())
}
