use std::fs;

use crate::cancel::CancelToken;
use crate::config::DatasetKind;
use crate::db::runs::get_recent_runs;
use crate::errors::PipelineError;
use crate::pipeline::Pipeline;
use crate::spreadsheets::xlsx_path_for;
use crate::tests::utils::{card_markup, init_test_db, temp_config, APARTMENT_JSON_LD};

fn three_cards() -> Vec<String> {
    vec![
        card_markup("Flat with data", Some(APARTMENT_JSON_LD)),
        card_markup("Flat without data", None),
        card_markup("House with data", Some(r#"{"@type": "House", "name": "Duplex"}"#)),
    ]
}

#[test]
fn archived_cards_flow_into_both_datasets() {
    let (_dir, config) = temp_config();
    let layout = config.layout.clone();
    let pipeline = Pipeline::new(config, CancelToken::new());

    let archived = pipeline.archive(&three_cards()).unwrap();
    assert_eq!(archived.snapshots_collected, 3);

    let (report, datasets) = pipeline.process_archived(DatasetKind::Markup).unwrap();

    assert_eq!(report.snapshots_collected, 3);
    assert_eq!(report.structured_parsed, 2);
    assert_eq!(report.markup_parsed, 3);
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.skipped_malformed, 0);

    let structured: Vec<usize> = datasets.structured.iter().map(|r| r.index).collect();
    let markup: Vec<usize> = datasets.markup.iter().map(|r| r.index).collect();
    assert_eq!(structured, vec![0, 2]);
    assert_eq!(markup, vec![0, 1, 2]);

    // Records describing the same card share an index.
    let house = &datasets.structured[1];
    let house_card = datasets.markup.iter().find(|r| r.index == house.index).unwrap();
    assert_eq!(house.name.as_deref(), Some("Duplex"));
    assert_eq!(house_card.title.as_deref(), Some("House with data"));

    let csv = fs::read_to_string(&layout.structured_csv).unwrap();
    assert!(csv.starts_with("index,title,description,address"));
    assert_eq!(csv.lines().count(), 3);
    assert!(layout.markup_csv.exists());
}

#[test]
fn load_reads_the_persisted_dataset() {
    let (_dir, config) = temp_config();
    let db = init_test_db(&config);
    let pipeline = Pipeline::new(config, CancelToken::new());
    pipeline.archive(&three_cards()).unwrap();
    pipeline.normalize().unwrap();

    let report = pipeline.load(DatasetKind::Structured).unwrap();

    assert_eq!(report.rows_written, 2);
    let (title, price): (String, f64) = db
        .with_conn(|conn| {
            conn.query_row(
                "SELECT title, price FROM properties WHERE \"index\" = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| PipelineError::Config(e.to_string()))
        })
        .unwrap();
    assert_eq!(title, "3 BHK Flat for Sale in Kondapur");
    assert_eq!(price, 12_500_000.0);
}

#[test]
fn xlsx_export_sits_next_to_the_csv() {
    let (_dir, mut config) = temp_config();
    config.export_xlsx = true;
    let layout = config.layout.clone();
    let pipeline = Pipeline::new(config, CancelToken::new());
    pipeline.archive(&three_cards()).unwrap();

    pipeline.normalize().unwrap();
    pipeline.extract().unwrap();

    assert!(xlsx_path_for(&layout.structured_csv).exists());
    assert!(xlsx_path_for(&layout.markup_csv).exists());
}

#[test]
fn load_without_a_dataset_fails() {
    let (_dir, config) = temp_config();
    let pipeline = Pipeline::new(config, CancelToken::new());

    let result = pipeline.load(DatasetKind::Markup);

    assert!(matches!(result, Err(PipelineError::Persistence { .. })));
}

#[test]
fn empty_archive_still_writes_headers() {
    let (_dir, config) = temp_config();
    let layout = config.layout.clone();
    let pipeline = Pipeline::new(config, CancelToken::new());
    pipeline.archive(&[]).unwrap();

    let (report, _) = pipeline.process_archived(DatasetKind::Markup).unwrap();

    assert_eq!(report.snapshots_collected, 0);
    assert_eq!(report.rows_written, 0);
    let csv = fs::read_to_string(&layout.markup_csv).unwrap();
    assert_eq!(csv.lines().count(), 1);
    assert!(csv.starts_with("index,Title,Price (INR)"));
}

#[test]
fn recorded_runs_land_in_the_history() {
    let (_dir, config) = temp_config();
    let db = init_test_db(&config);
    let pipeline = Pipeline::new(config, CancelToken::new());
    pipeline.archive(&three_cards()).unwrap();

    pipeline
        .recorded("process", |p| p.process_archived(DatasetKind::Markup).map(|(r, _)| r))
        .unwrap();
    let failed = pipeline.recorded("load", |_| Err(PipelineError::Cancelled));
    assert!(failed.is_err());

    let runs = db.with_conn(|conn| get_recent_runs(conn, 10)).unwrap();
    assert_eq!(runs.len(), 2);

    let load = &runs[0];
    assert_eq!(load.command, "load");
    assert!(!load.success);
    assert_eq!(load.error_message.as_deref(), Some("Cancelled"));

    let process = &runs[1];
    assert_eq!(process.command, "process");
    assert!(process.success);
    assert_eq!(process.markup_records, Some(3));
    assert_eq!(process.rows_written, Some(3));
    assert!(process.url.is_none());
}

#[test]
fn cancel_before_load_keeps_the_previous_table() {
    let (_dir, config) = temp_config();
    let db = init_test_db(&config);
    let cancel = CancelToken::new();
    let pipeline = Pipeline::new(config, cancel.clone());
    pipeline.archive(&three_cards()).unwrap();
    pipeline.process_archived(DatasetKind::Markup).unwrap();

    cancel.cancel();
    let result = pipeline.load(DatasetKind::Structured);

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    let rows: i64 = db
        .with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
                .map_err(|e| PipelineError::Config(e.to_string()))
        })
        .unwrap();
    assert_eq!(rows, 3);
}

#[test]
fn loading_over_the_run_history_is_refused() {
    let (_dir, mut config) = temp_config();
    config.table = "pipeline_runs".to_string();
    let db = init_test_db(&config);
    let pipeline = Pipeline::new(config, CancelToken::new());
    pipeline.archive(&three_cards()).unwrap();

    let result =
        pipeline.recorded("process", |p| p.process_archived(DatasetKind::Markup).map(|(r, _)| r));

    assert!(matches!(result, Err(PipelineError::Config(_))));
    let runs = db.with_conn(|conn| get_recent_runs(conn, 10)).unwrap();
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].success);
}
