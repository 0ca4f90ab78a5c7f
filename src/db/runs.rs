use rusqlite::{params, Connection};

use crate::domain::run::{RunReport, Stage};
use crate::errors::{PipelineError, PipelineResult};

#[derive(Debug)]
pub struct PipelineRun {
    pub id: i64,
    pub command: String,
    pub url: Option<String>,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub snapshots: Option<i64>,
    pub structured_records: Option<i64>,
    pub markup_records: Option<i64>,
    pub rows_written: Option<i64>,
    pub skipped: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

fn db_err(e: rusqlite::Error) -> PipelineError {
    PipelineError::persist(Stage::Load, None, e)
}

pub fn start_run(
    conn: &Connection,
    command: &str,
    url: Option<&str>,
    now: i64,
) -> PipelineResult<i64> {
    conn.execute(
        "INSERT INTO pipeline_runs (command, url, started_at, success) VALUES (?, ?, ?, 0)",
        params![command, url, now],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn end_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    report: &RunReport,
    error: Option<String>,
) -> PipelineResult<()> {
    conn.execute(
        "UPDATE pipeline_runs SET finished_at = ?, snapshots = ?, structured_records = ?, markup_records = ?, rows_written = ?, skipped = ?, success = ?, error_message = ? WHERE id = ?",
        params![
            now,
            report.snapshots_collected as i64,
            report.structured_parsed as i64,
            report.markup_parsed as i64,
            report.rows_written as i64,
            report.skipped_malformed as i64,
            error.is_none(),
            error,
            run_id
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

pub fn get_recent_runs(conn: &Connection, limit: usize) -> PipelineResult<Vec<PipelineRun>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, command, url, started_at, finished_at, snapshots, structured_records, markup_records, rows_written, skipped, success, error_message
             FROM pipeline_runs ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(PipelineRun {
                id: row.get(0)?,
                command: row.get(1)?,
                url: row.get(2)?,
                started_at: row.get(3)?,
                finished_at: row.get(4)?,
                snapshots: row.get(5)?,
                structured_records: row.get(6)?,
                markup_records: row.get(7)?,
                rows_written: row.get(8)?,
                skipped: row.get(9)?,
                success: row.get(10)?,
                error_message: row.get(11)?,
            })
        })
        .map_err(db_err)?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r.map_err(db_err)?);
    }
    Ok(runs)
}
