// config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{PipelineError, PipelineResult};

pub const DEFAULT_LISTING_URL: &str = "https://www.magicbricks.com/property-for-sale/residential-commercial-real-estate?proptype=Multistorey-Apartment,Builder-Floor-Apartment,Penthouse,Studio-Apartment,Residential-House,Villa,Residential-Plot,Commercial-Office-Space,Office-ITPark-SEZ,Commercial-Shop,Commercial-Showroom,Commercial-Land,Industrial-Land,Warehouse/Godown,Industrial-Building,Industrial-Shed&BudgetMin=1-Crores&BudgetMax=1.5-Crores&cityName=Hyderabad";

pub const DEFAULT_TABLE: &str = "properties";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.199 Safari/537.36";

/// Everything a run needs, built once from the command line and passed down.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub layout: DataLayout,
    pub collector: CollectorConfig,
    pub extraction: ExtractionContext,
    pub db_path: PathBuf,
    pub table: String,
    pub export_xlsx: bool,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            layout: DataLayout::new(data_dir),
            collector: CollectorConfig::default(),
            extraction: ExtractionContext::default(),
            db_path: db_path.into(),
            table: DEFAULT_TABLE.to_string(),
            export_xlsx: false,
        }
    }
}

/// On-disk locations of the raw snapshots and the processed datasets.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub raw_html_dir: PathBuf,
    pub raw_json_dir: PathBuf,
    pub structured_csv: PathBuf,
    pub markup_csv: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let root: PathBuf = data_dir.into();
        Self {
            raw_html_dir: root.join("raw").join("extracted_html"),
            raw_json_dir: root.join("raw").join("extracted_json"),
            structured_csv: root.join("processed").join("cleaned_property_data.csv"),
            markup_csv: root.join("processed").join("html_data.csv"),
        }
    }
}

/// Browser session and scroll loop settings.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub url: String,
    pub scroll_pause: Duration,
    pub max_scrolls: usize,
    /// Wait after navigation before the first card read.
    pub initial_wait: Duration,
    pub headless: bool,
    pub user_agent: String,
    pub window_size: (u32, u32),
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LISTING_URL.to_string(),
            scroll_pause: Duration::from_secs(2),
            max_scrolls: 50,
            initial_wait: Duration::from_secs(5),
            headless: true,
            user_agent: USER_AGENT.to_string(),
            window_size: (1920, 1080),
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| PipelineError::Config(format!("Invalid listing URL '{}': {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PipelineError::Config(format!(
                "Listing URL must be http(s), got '{}'",
                parsed.scheme()
            )));
        }
        if self.max_scrolls == 0 {
            return Err(PipelineError::Config("max scrolls must be at least 1".into()));
        }
        Ok(())
    }
}

/// Site-specific knobs used while turning cards into records.
///
/// Passed explicitly into the archiver and both normalizers so nothing
/// depends on process-wide state.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub card_selector: String,
    pub currency_glyphs: Vec<String>,
    pub digit_separators: Vec<char>,
    /// Space variants read as a plain space, e.g. the NBSP in `1.35\u{a0}Cr`.
    pub space_variants: Vec<char>,
    pub possession_marker: String,
}

impl Default for ExtractionContext {
    fn default() -> Self {
        Self {
            card_selector: "div.mb-srp__card".to_string(),
            // "â‚¹" is the rupee sign decoded as cp1252, seen on some pages.
            currency_glyphs: vec!["\u{20b9}".to_string(), "â‚¹".to_string(), "Rs.".to_string()],
            digit_separators: vec![','],
            space_variants: vec!['\u{a0}', '\u{202f}'],
            possession_marker: "Under Construction".to_string(),
        }
    }
}

/// Table holding the run history; datasets may never be loaded over it.
pub const RUNS_TABLE: &str = "pipeline_runs";

/// Reject table names that are not plain SQL identifiers, and names the
/// sink must not replace (run history, SQLite internals).
pub fn validate_table_name(name: &str) -> PipelineResult<()> {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !(starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')) {
        return Err(PipelineError::Config(format!("Invalid table name '{name}'")));
    }

    // SQLite identifiers are case-insensitive.
    let lowered = name.to_ascii_lowercase();
    if lowered == RUNS_TABLE || lowered.starts_with("sqlite_") {
        return Err(PipelineError::Config(format!("Table name '{name}' is reserved")));
    }
    Ok(())
}

pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Which of the two datasets a load targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DatasetKind {
    Structured,
    Markup,
}
