use rusqlite::Connection;
use std::cell::RefCell;
use std::path::PathBuf;

use crate::config::ensure_parent;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, keyed by the path it was opened for.
thread_local! {
    static DB_CONN: RefCell<Option<(PathBuf, Connection)>> = const { RefCell::new(None) };
}

#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&mut Connection) -> PipelineResult<T>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                let reopen = !matches!(slot.as_ref(), Some((path, _)) if *path == self.path);
                if reopen {
                    ensure_parent(&self.path).map_err(|e| {
                        PipelineError::persist(Stage::Load, None, format!("Create DB dir failed: {e}"))
                    })?;
                    let conn = Connection::open(&self.path).map_err(|e| {
                        PipelineError::persist(Stage::Load, None, format!("Open DB failed: {e}"))
                    })?;
                    *slot = Some((self.path.clone(), conn));
                }
                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(PipelineError::persist(Stage::Load, None, "No DB connection")),
                }
            })
            .map_err(|e| PipelineError::persist(Stage::Load, None, e))?
    }
}

/// Apply the bundled schema (idempotent).
pub fn init_db(db: &Database) -> PipelineResult<()> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL).map_err(|e| {
            PipelineError::persist(Stage::Load, None, format!("Failed to apply schema: {e}"))
        })
    })?;

    tracing::debug!("Database initialized at {}", db.path.display());
    Ok(())
}
