use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, ToSql};
use tracing::info;

use crate::config::validate_table_name;
use crate::db::connection::Database;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};
use crate::spreadsheets::table::{Cell, DatasetRow};

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Cell::Integer(n) => n.to_sql(),
            Cell::Real(Some(n)) => n.to_sql(),
            Cell::Text(Some(s)) => s.to_sql(),
            Cell::Real(None) | Cell::Text(None) => Ok(ToSqlOutput::Owned(Value::Null)),
        }
    }
}

/// Loads a finished dataset into one table, replacing whatever was there.
pub struct Sink {
    db: Database,
}

impl Sink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Drop, recreate and fill `table` in a single transaction.
    ///
    /// Either the whole new dataset becomes visible or the old table stays.
    pub fn replace<R: DatasetRow>(&self, table: &str, rows: &[R]) -> PipelineResult<usize> {
        validate_table_name(table)?;
        let db_err = |index: Option<usize>, e: rusqlite::Error| PipelineError::persist(Stage::Load, index, e);

        let written = self.db.with_conn(|conn| {
            let tx = conn.transaction().map_err(|e| db_err(None, e))?;

            tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
                .map_err(|e| db_err(None, e))?;
            tx.execute_batch(&create_table_sql::<R>(table))
                .map_err(|e| db_err(None, e))?;

            {
                let mut stmt = tx
                    .prepare(&insert_sql::<R>(table))
                    .map_err(|e| db_err(None, e))?;
                for row in rows {
                    stmt.execute(params_from_iter(row.cells()))
                        .map_err(|e| db_err(Some(row.index()), e))?;
                }
            }

            tx.commit().map_err(|e| db_err(None, e))?;
            Ok(rows.len())
        })?;

        info!("SQL data inserted: {written} rows into '{table}'");
        Ok(written)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql<R: DatasetRow>(table: &str) -> String {
    let columns: Vec<String> = R::COLUMNS
        .iter()
        .map(|c| format!("{} {}", quote_ident(c.name), c.kind.sql_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "))
}

fn insert_sql<R: DatasetRow>(table: &str) -> String {
    let names: Vec<String> = R::COLUMNS.iter().map(|c| quote_ident(c.name)).collect();
    let marks: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        marks.join(", ")
    )
}
