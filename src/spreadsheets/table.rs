use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A single typed value in a dataset row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Real(Option<f64>),
    Text(Option<String>),
}

/// A row type that can be written as CSV, exported to a workbook and loaded
/// into the sink. `cells()` must line up with `COLUMNS`.
pub trait DatasetRow: Serialize + DeserializeOwned + Send + Sync {
    const COLUMNS: &'static [Column];

    fn index(&self) -> usize;

    fn cells(&self) -> Vec<Cell>;
}
