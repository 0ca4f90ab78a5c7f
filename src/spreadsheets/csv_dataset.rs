use std::path::Path;

use tracing::info;

use crate::archive::write_atomic;
use crate::config::ensure_parent;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};
use crate::spreadsheets::table::DatasetRow;

/// Write a dataset as CSV in one atomic replace. The header row is always
/// written, even for an empty dataset.
pub fn write_dataset<R: DatasetRow>(path: &Path, rows: &[R], stage: Stage) -> PipelineResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(R::COLUMNS.iter().map(|c| c.name))
        .map_err(|e| PipelineError::persist(stage, None, format!("Failed to write header: {e}")))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| PipelineError::persist(stage, Some(row.index()), e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::persist(stage, None, e.error()))?;

    ensure_parent(path).map_err(|e| PipelineError::persist(stage, None, e))?;
    write_atomic(path, &bytes).map_err(|e| PipelineError::persist(stage, None, e))?;

    info!("Saved {} records to {}", rows.len(), path.display());
    Ok(())
}

/// Read back a dataset written by [`write_dataset`].
pub fn read_dataset<R: DatasetRow>(path: &Path, stage: Stage) -> PipelineResult<Vec<R>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        PipelineError::persist(stage, None, format!("Failed to open {}: {e}", path.display()))
    })?;

    reader
        .deserialize()
        .enumerate()
        .map(|(line, row)| {
            row.map_err(|e| {
                PipelineError::persist(stage, None, format!("{} row {line}: {e}", path.display()))
            })
        })
        .collect()
}
