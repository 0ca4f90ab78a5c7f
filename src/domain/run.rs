// src/domain/run.rs

use std::fmt;

/// Stages that write output, in the order a full run executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Archive,
    Normalize,
    Extract,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Archive => "archive",
            Stage::Normalize => "normalize",
            Stage::Extract => "extract",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

/// Counts reported at the end of every run (or single stage).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub snapshots_collected: usize,
    pub structured_parsed: usize,
    pub markup_parsed: usize,
    pub rows_written: usize,
    /// Malformed JSON-LD blocks, dropped structured records and markup cards
    /// that fell back to an empty row.
    pub skipped_malformed: usize,
}

impl RunReport {
    pub fn merge(&mut self, other: &RunReport) {
        self.snapshots_collected += other.snapshots_collected;
        self.structured_parsed += other.structured_parsed;
        self.markup_parsed += other.markup_parsed;
        self.rows_written += other.rows_written;
        self.skipped_malformed += other.skipped_malformed;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} snapshots, {} structured records, {} markup records, {} rows written, {} skipped",
            self.snapshots_collected,
            self.structured_parsed,
            self.markup_parsed,
            self.rows_written,
            self.skipped_malformed,
        )
    }
}
