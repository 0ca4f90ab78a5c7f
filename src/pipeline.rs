// pipeline.rs
use std::path::Path;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::archive::{CardArchiver, SnapshotStore};
use crate::cancel::CancelToken;
use crate::collector::collect_listings;
use crate::config::{DatasetKind, PipelineConfig};
use crate::db::{init_db, runs, Database, Sink};
use crate::domain::listing::{MarkupListingRecord, StructuredListingRecord};
use crate::domain::run::{RunReport, Stage};
use crate::errors::{PipelineError, PipelineResult};
use crate::normalize::{MarkupFeatureExtractor, StructuredNormalizer};
use crate::spreadsheets::table::DatasetRow;
use crate::spreadsheets::{export_dataset_xlsx, read_dataset, write_dataset, xlsx_path_for};

/// Both datasets produced from one set of archived snapshots.
#[derive(Debug, Default)]
pub struct Datasets {
    pub structured: Vec<StructuredListingRecord>,
    pub markup: Vec<MarkupListingRecord>,
}

/// Runs the stages against one data directory and one database.
///
/// Each stage reads only what the previous one persisted, so any of them can
/// be re-run on its own after a failure.
pub struct Pipeline {
    config: PipelineConfig,
    store: SnapshotStore,
    db: Database,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, cancel: CancelToken) -> Self {
        let store = SnapshotStore::new(&config.layout);
        let db = Database::new(config.db_path.clone());
        Self {
            config,
            store,
            db,
            cancel,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Scroll the listing page and archive every unique card.
    pub fn collect(&self) -> PipelineResult<RunReport> {
        info!(">>> Starting listing collection <<<");
        let collection = collect_listings(
            &self.config.collector,
            &self.config.extraction,
            &self.cancel,
        )?;
        info!(
            "Total property cards collected: {} after {} scrolls",
            collection.cards.len(),
            collection.scrolls()
        );
        self.archive(&collection.cards)
    }

    pub fn archive(&self, cards: &[String]) -> PipelineResult<RunReport> {
        let report = CardArchiver::new(self.store.clone()).archive(cards, &self.cancel)?;
        Ok(RunReport {
            snapshots_collected: report.snapshots,
            skipped_malformed: report.malformed_blocks,
            ..Default::default()
        })
    }

    /// Structured dataset from the archived JSON-LD files.
    pub fn normalize(&self) -> PipelineResult<(RunReport, Vec<StructuredListingRecord>)> {
        info!("*** Starting property JSON cleaning process ***");
        let outcome =
            StructuredNormalizer::new(&self.store, &self.config.extraction).run(&self.cancel)?;
        self.persist_dataset(&self.config.layout.structured_csv, &outcome.records, Stage::Normalize)?;

        let report = RunReport {
            structured_parsed: outcome.records.len(),
            skipped_malformed: outcome.dropped,
            ..Default::default()
        };
        Ok((report, outcome.records))
    }

    /// Markup dataset from the archived card HTML.
    pub fn extract(&self) -> PipelineResult<(RunReport, Vec<MarkupListingRecord>)> {
        info!(">>> Starting HTML card extraction <<<");
        let outcome =
            MarkupFeatureExtractor::new(&self.store, &self.config.extraction).run(&self.cancel)?;
        self.persist_dataset(&self.config.layout.markup_csv, &outcome.records, Stage::Extract)?;

        let report = RunReport {
            markup_parsed: outcome.records.len() - outcome.failed,
            skipped_malformed: outcome.failed,
            ..Default::default()
        };
        Ok((report, outcome.records))
    }

    /// Normalize and extract from whatever is archived, then load one dataset.
    pub fn process_archived(&self, dataset: DatasetKind) -> PipelineResult<(RunReport, Datasets)> {
        let mut report = RunReport {
            snapshots_collected: self.archived_count()?,
            ..Default::default()
        };

        let (structured_report, structured) = self.normalize()?;
        report.merge(&structured_report);
        let (markup_report, markup) = self.extract()?;
        report.merge(&markup_report);

        report.rows_written = match dataset {
            DatasetKind::Structured => self.load_rows(&structured)?,
            DatasetKind::Markup => self.load_rows(&markup)?,
        };

        Ok((report, Datasets { structured, markup }))
    }

    /// Every stage, start to finish.
    pub fn run(&self, dataset: DatasetKind) -> PipelineResult<RunReport> {
        let archived = self.collect()?;
        let (mut report, _) = self.process_archived(dataset)?;
        report.skipped_malformed += archived.skipped_malformed;
        Ok(report)
    }

    /// Load a dataset previously written to disk.
    pub fn load(&self, dataset: DatasetKind) -> PipelineResult<RunReport> {
        let layout = &self.config.layout;
        let rows_written = match dataset {
            DatasetKind::Structured => {
                let rows: Vec<StructuredListingRecord> =
                    read_dataset(&layout.structured_csv, Stage::Load)?;
                self.load_rows(&rows)?
            }
            DatasetKind::Markup => {
                let rows: Vec<MarkupListingRecord> = read_dataset(&layout.markup_csv, Stage::Load)?;
                self.load_rows(&rows)?
            }
        };
        Ok(RunReport {
            rows_written,
            ..Default::default()
        })
    }

    /// Run `f`, bracketing it with a row in `pipeline_runs`.
    ///
    /// Failing to record the run is logged, never fatal.
    pub fn recorded<F>(&self, command: &str, f: F) -> PipelineResult<RunReport>
    where
        F: FnOnce(&Self) -> PipelineResult<RunReport>,
    {
        let url = (command == "run" || command == "collect").then_some(self.config.collector.url.as_str());
        let run_id = init_db(&self.db)
            .and_then(|_| {
                self.db
                    .with_conn(|conn| runs::start_run(conn, command, url, Utc::now().timestamp()))
            })
            .map_err(|e| warn!("Could not record run start: {e}"))
            .ok();

        let result = f(self);

        if let Some(run_id) = run_id {
            let (report, error) = match &result {
                Ok(report) => (report.clone(), None),
                Err(e) => (RunReport::default(), Some(e.to_string())),
            };
            let ended = self.db.with_conn(|conn| {
                runs::end_run(conn, run_id, Utc::now().timestamp(), &report, error)
            });
            if let Err(e) = ended {
                warn!("Could not record run end: {e}");
            }
        }

        match &result {
            Ok(report) => info!("PIPELINE COMPLETED: {report}"),
            Err(e) => error!("Pipeline failed in '{command}': {e}"),
        }
        result
    }

    fn load_rows<R: DatasetRow>(&self, rows: &[R]) -> PipelineResult<usize> {
        self.cancel.check()?;
        info!(">>> Data insertion started into '{}' <<<", self.config.table);
        Sink::new(self.db.clone()).replace(&self.config.table, rows)
    }

    fn persist_dataset<R: DatasetRow>(&self, path: &Path, rows: &[R], stage: Stage) -> PipelineResult<()> {
        write_dataset(path, rows, stage)?;
        if self.config.export_xlsx {
            export_dataset_xlsx(rows, &xlsx_path_for(path), stage)?;
        }
        Ok(())
    }

    fn archived_count(&self) -> PipelineResult<usize> {
        self.store
            .markup_files()
            .map(|files| files.len())
            .map_err(|e| PipelineError::persist(Stage::Extract, None, e))
    }
}
