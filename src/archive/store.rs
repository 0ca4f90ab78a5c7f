// archive/store.rs
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::DataLayout;
use crate::domain::listing::ListingCardSnapshot;

const CARD_PREFIX: &str = "card_";
const TMP_SUFFIX: &str = ".tmp";
const STAGING_SUFFIX: &str = ".staging";
const RETIRED_SUFFIX: &str = ".old";

/// Per-card files on disk: `card_{index}.html` and `card_{index}.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    html_dir: PathBuf,
    json_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(layout: &DataLayout) -> Self {
        Self {
            html_dir: layout.raw_html_dir.clone(),
            json_dir: layout.raw_json_dir.clone(),
        }
    }

    pub fn markup_path(&self, index: usize) -> PathBuf {
        self.html_dir.join(format!("{CARD_PREFIX}{index}.html"))
    }

    pub fn structured_path(&self, index: usize) -> PathBuf {
        self.json_dir.join(format!("{CARD_PREFIX}{index}.json"))
    }

    /// A store over sibling directories (`extracted_html.staging`, ...) that
    /// a run fills before [`promote`](Self::promote) swaps it in.
    pub fn staging(&self) -> Self {
        Self {
            html_dir: sibling(&self.html_dir, STAGING_SUFFIX),
            json_dir: sibling(&self.json_dir, STAGING_SUFFIX),
        }
    }

    /// Replace this store's directories with the ones in `staged`.
    pub fn promote(&self, staged: &SnapshotStore) -> io::Result<()> {
        swap_dir(&self.html_dir, &staged.html_dir)?;
        swap_dir(&self.json_dir, &staged.json_dir)
    }

    /// Remove both directories and everything in them.
    pub fn discard(&self) -> io::Result<()> {
        for dir in [&self.html_dir, &self.json_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Create both directories and drop everything a previous run left behind.
    pub fn reset(&self) -> io::Result<usize> {
        let mut removed = 0;
        for dir in [&self.html_dir, &self.json_dir] {
            fs::create_dir_all(dir)?;
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                let is_card = name.starts_with(CARD_PREFIX) || is_temp_name(&name);
                if is_card && entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    pub fn write_markup(&self, index: usize, markup: &str) -> io::Result<PathBuf> {
        let path = self.markup_path(index);
        write_atomic(&path, markup.as_bytes())?;
        Ok(path)
    }

    pub fn write_structured(&self, index: usize, block: &Value) -> io::Result<PathBuf> {
        let path = self.structured_path(index);
        let body = serde_json::to_vec_pretty(block)?;
        write_atomic(&path, &body)?;
        Ok(path)
    }

    /// Archived markup files ordered by index.
    pub fn markup_files(&self) -> io::Result<Vec<(usize, PathBuf)>> {
        list_cards(&self.html_dir, "html")
    }

    /// Archived structured files ordered by index.
    pub fn structured_files(&self) -> io::Result<Vec<(usize, PathBuf)>> {
        list_cards(&self.json_dir, "json")
    }

    pub fn read_snapshot(&self, index: usize, path: &Path) -> io::Result<ListingCardSnapshot> {
        let raw_markup = fs::read_to_string(path)?;
        let captured_at = fs::metadata(path)?
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(ListingCardSnapshot {
            index,
            raw_markup,
            captured_at,
        })
    }
}

/// Write to a hidden sibling, flush, then rename over the target so readers
/// only ever see a complete file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = path.with_file_name(format!(".{}{TMP_SUFFIX}", file_name.to_string_lossy()));

    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// `data/raw/extracted_html` + `.staging` -> `data/raw/extracted_html.staging`
fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    dir.with_file_name(name)
}

// The live directory is moved aside before the rename; rename cannot replace
// a non-empty directory.
fn swap_dir(live: &Path, next: &Path) -> io::Result<()> {
    let retired = sibling(live, RETIRED_SUFFIX);
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    if live.exists() {
        fs::rename(live, &retired)?;
    }
    fs::rename(next, live)?;
    if retired.exists() {
        fs::remove_dir_all(&retired)?;
    }
    Ok(())
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TMP_SUFFIX)
}

fn list_cards(dir: &Path, ext: &str) -> io::Result<Vec<(usize, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut cards = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| card_index(n, ext));
        if let Some(index) = index {
            cards.push((index, path));
        }
    }
    cards.sort_by_key(|(index, _)| *index);
    Ok(cards)
}

/// `card_12.html` -> `Some(12)`.
fn card_index(file_name: &str, ext: &str) -> Option<usize> {
    file_name
        .strip_prefix(CARD_PREFIX)?
        .strip_suffix(ext)?
        .strip_suffix('.')?
        .parse()
        .ok()
}
