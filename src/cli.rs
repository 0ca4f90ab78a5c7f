use std::path::PathBuf;
use std::time::Duration;

use chrono::DateTime;
use clap::{Args, Parser, Subcommand};

use crate::cancel::CancelToken;
use crate::config::{
    validate_table_name, DatasetKind, PipelineConfig, DEFAULT_LISTING_URL, DEFAULT_TABLE,
};
use crate::db::{init_db, runs};
use crate::domain::run::RunReport;
use crate::errors::PipelineResult;
use crate::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(
    name = "listing_pipeline",
    about = "Scroll a property listing page, archive each card and build listing datasets"
)]
pub struct Cli {
    /// Root for raw snapshots and processed datasets
    #[arg(long, env = "LISTINGS_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// SQLite database the sink writes to
    #[arg(long, env = "LISTINGS_DB", default_value = "data/listings.sqlite3", global = true)]
    pub db: PathBuf,

    /// Also write each dataset as an .xlsx workbook
    #[arg(long, global = true)]
    pub xlsx: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect, archive, normalize, extract and load in one go
    Run {
        #[command(flatten)]
        collect: CollectArgs,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Scroll the listing page and archive every card
    Collect {
        #[command(flatten)]
        collect: CollectArgs,
    },
    /// Build the structured dataset from archived JSON-LD
    Normalize,
    /// Build the markup dataset from archived card HTML
    Extract,
    /// Normalize + extract + load from what is already archived
    Process {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Load a dataset CSV into the database, replacing the table
    Load {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Show recent pipeline runs
    Runs {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Listing page to scroll
    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    pub url: String,

    /// Seconds to wait after each scroll
    #[arg(long, default_value = "2", value_parser = parse_pause)]
    pub scroll_pause: Duration,

    /// Upper bound on scrolls before giving up on a stable page
    #[arg(long, default_value_t = 50)]
    pub max_scrolls: usize,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Dataset loaded into the table
    #[arg(long, value_enum, default_value_t = DatasetKind::Markup)]
    pub dataset: DatasetKind,

    /// Target table (replaced on every load)
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,
}

fn parse_pause(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|e| format!("'{raw}' is not a number of seconds: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid pause '{raw}': {e}"))
}

impl Cli {
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.data_dir, &self.db);
        config.export_xlsx = self.xlsx;

        match &self.command {
            Commands::Run { collect, load } => {
                apply_collect(&mut config, collect);
                config.table = load.table.clone();
            }
            Commands::Collect { collect } => apply_collect(&mut config, collect),
            Commands::Process { load } | Commands::Load { load } => config.table = load.table.clone(),
            Commands::Normalize | Commands::Extract | Commands::Runs { .. } => {}
        }
        config
    }
}

fn apply_collect(config: &mut PipelineConfig, args: &CollectArgs) {
    config.collector.url = args.url.clone();
    config.collector.scroll_pause = args.scroll_pause;
    config.collector.max_scrolls = args.max_scrolls;
    config.collector.headless = !args.headful;
}

/// Dispatch one subcommand. Called off the async runtime.
pub fn execute(cli: Cli, cancel: CancelToken) -> PipelineResult<()> {
    let config = cli.config();
    validate_table_name(&config.table)?;
    let pipeline = Pipeline::new(config, cancel);

    let report = match &cli.command {
        Commands::Run { load, .. } => {
            let dataset = load.dataset;
            pipeline.recorded("run", |p| p.run(dataset))?
        }
        Commands::Collect { .. } => pipeline.recorded("collect", |p| p.collect())?,
        Commands::Normalize => pipeline.recorded("normalize", |p| p.normalize().map(|(r, _)| r))?,
        Commands::Extract => pipeline.recorded("extract", |p| p.extract().map(|(r, _)| r))?,
        Commands::Process { load } => {
            let dataset = load.dataset;
            pipeline.recorded("process", |p| p.process_archived(dataset).map(|(r, _)| r))?
        }
        Commands::Load { load } => {
            let dataset = load.dataset;
            pipeline.recorded("load", |p| p.load(dataset))?
        }
        Commands::Runs { limit } => {
            print_runs(&pipeline, *limit)?;
            return Ok(());
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Snapshots collected:       {}", report.snapshots_collected);
    println!("Structured records parsed: {}", report.structured_parsed);
    println!("Markup records parsed:     {}", report.markup_parsed);
    println!("Rows written:              {}", report.rows_written);
    println!("Skipped (malformed):       {}", report.skipped_malformed);
}

fn print_runs(pipeline: &Pipeline, limit: usize) -> PipelineResult<()> {
    let db = pipeline.database();
    init_db(db)?;
    let rows = db.with_conn(|conn| runs::get_recent_runs(conn, limit))?;
    if rows.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!(
        "{:>4} | {:<9} | {:<19} | {:>5} | {:>5} | {:>5} | {:>5} | {:>4} | {:<6}",
        "#", "Command", "Started", "Cards", "JSON", "HTML", "Rows", "Skip", "Result"
    );
    println!("{}", "-".repeat(86));

    let num = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
    for r in &rows {
        let started = DateTime::from_timestamp(r.started_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| r.started_at.to_string());
        let outcome = match (r.finished_at, r.success) {
            (None, _) => "open",
            (Some(_), true) => "ok",
            (Some(_), false) => "failed",
        };
        println!(
            "{:>4} | {:<9} | {:<19} | {:>5} | {:>5} | {:>5} | {:>5} | {:>4} | {:<6}",
            r.id,
            r.command,
            started,
            num(r.snapshots),
            num(r.structured_records),
            num(r.markup_records),
            num(r.rows_written),
            num(r.skipped),
            outcome
        );
        if let Some(err) = &r.error_message {
            println!("       {err}");
        }
        if let Some(url) = &r.url {
            println!("       {url}");
        }
    }
    Ok(())
}
