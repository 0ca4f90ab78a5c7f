use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::archive::write_atomic;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};
use crate::spreadsheets::table::{Cell, DatasetRow};

/// `data/processed/html_data.csv` -> `data/processed/html_data.xlsx`
pub fn xlsx_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("xlsx")
}

/// Export a dataset as a single-sheet workbook, nulls left as blank cells.
pub fn export_dataset_xlsx<R: DatasetRow>(
    rows: &[R],
    path: &Path,
    stage: Stage,
) -> PipelineResult<()> {
    let xlsx_err = |what: &str, e: rust_xlsxwriter::XlsxError| {
        PipelineError::persist(stage, None, format!("Failed to write {what}: {e}"))
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    // Headers
    for (col, column) in R::COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, column.name)
            .map_err(|e| xlsx_err(&format!("header '{}'", column.name), e))?;
    }

    // Rows
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.cells().into_iter().enumerate() {
            let col = col as u16;
            let result = match cell {
                Cell::Integer(n) => worksheet.write_number(r, col, n as f64).map(|_| ()),
                Cell::Real(Some(n)) => worksheet.write_number(r, col, n).map(|_| ()),
                Cell::Text(Some(s)) => worksheet.write_string(r, col, s).map(|_| ()),
                Cell::Real(None) | Cell::Text(None) => Ok(()),
            };
            result.map_err(|e| xlsx_err(&format!("card {} column {col}", row.index()), e))?;
        }
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|e| xlsx_err("workbook", e))?;
    write_atomic(path, &buffer).map_err(|e| PipelineError::persist(stage, None, e))?;

    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}
