// normalize/structured.rs
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::archive::SnapshotStore;
use crate::cancel::CancelToken;
use crate::config::ExtractionContext;
use crate::domain::listing::StructuredListingRecord;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};
use crate::normalize::numeric::number_from_json;

type Setter = fn(&mut StructuredListingRecord, &Value, &ExtractionContext);

// JSON-LD path -> canonical field. A missing or null segment leaves the
// field empty.
const FIELD_MAP: &[(&[&str], Setter)] = &[
    (&["name"], |r, v, _| r.name = text(v)),
    (&["description"], |r, v, _| r.description = text(v)),
    (&["address", "streetAddress"], |r, v, _| r.street_address = text(v)),
    (&["address", "addressLocality"], |r, v, _| r.locality = text(v)),
    (&["address", "addressRegion"], |r, v, _| r.region = text(v)),
    (&["geo", "latitude"], |r, v, ctx| r.latitude = number_from_json(v, ctx)),
    (&["geo", "longitude"], |r, v, ctx| r.longitude = number_from_json(v, ctx)),
    (&["offers", "price"], |r, v, ctx| r.price = number_from_json(v, ctx)),
    (&["offers", "priceCurrency"], |r, v, _| r.currency = text(v)),
    (&["@type"], |r, v, _| r.property_type = text(v)),
    (&["seller", "@type"], |r, v, _| r.seller_type = text(v)),
    (&["seller", "name"], |r, v, _| r.seller_name = text(v)),
    (&["url"], |r, v, _| r.url = text(v)),
];

/// Project one JSON-LD block onto the canonical structured schema.
///
/// Fails only when the block has an unexpected shape: a non-object root or
/// a path segment that is present but not an object.
pub fn project_record(
    index: usize,
    block: &Value,
    ctx: &ExtractionContext,
) -> PipelineResult<StructuredListingRecord> {
    if !block.is_object() {
        return Err(PipelineError::parse(
            Some(index),
            format!("expected a JSON object, found {}", kind(block)),
        ));
    }

    let mut record = StructuredListingRecord {
        index,
        ..Default::default()
    };
    for (path, set) in FIELD_MAP {
        let value = resolve(block, path).map_err(|msg| PipelineError::parse(Some(index), msg))?;
        if let Some(value) = value {
            set(&mut record, value, ctx);
        }
    }
    Ok(record)
}

fn resolve<'v>(root: &'v Value, path: &[&str]) -> Result<Option<&'v Value>, String> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Object(map) => match map.get(*segment) {
                None | Some(Value::Null) => return Ok(None),
                Some(next) => next,
            },
            other => {
                return Err(format!(
                    "expected an object before '{segment}' in '{}', found {}",
                    path.join("."),
                    kind(other)
                ))
            }
        };
    }
    Ok(Some(current))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // "@type" is sometimes a list, e.g. ["Apartment", "Product"].
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Default)]
pub struct StructuredOutcome {
    pub records: Vec<StructuredListingRecord>,
    pub dropped: usize,
}

/// Builds the structured dataset from every archived JSON-LD file.
pub struct StructuredNormalizer<'a> {
    store: &'a SnapshotStore,
    ctx: &'a ExtractionContext,
}

impl<'a> StructuredNormalizer<'a> {
    pub fn new(store: &'a SnapshotStore, ctx: &'a ExtractionContext) -> Self {
        Self { store, ctx }
    }

    pub fn run(&self, cancel: &CancelToken) -> PipelineResult<StructuredOutcome> {
        let files = self
            .store
            .structured_files()
            .map_err(|e| PipelineError::persist(Stage::Normalize, None, e))?;
        info!("Loaded {} structured files", files.len());

        let rows = files
            .par_iter()
            .map(|(index, path)| {
                cancel.check()?;
                Ok(self.normalize_file(*index, path))
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut outcome = StructuredOutcome::default();
        for row in rows {
            match row {
                Some(record) => outcome.records.push(record),
                None => outcome.dropped += 1,
            }
        }

        info!(
            "Parsed {} structured records ({} dropped)",
            outcome.records.len(),
            outcome.dropped
        );
        Ok(outcome)
    }

    fn normalize_file(&self, index: usize, path: &Path) -> Option<StructuredListingRecord> {
        let result = fs::read_to_string(path)
            .map_err(|e| PipelineError::parse(Some(index), format!("read failed: {e}")))
            .and_then(|body| {
                serde_json::from_str::<Value>(&body)
                    .map_err(|e| PipelineError::parse(Some(index), e.to_string()))
            })
            .and_then(|block| project_record(index, &block, self.ctx));

        match result {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to parse entry {}: {e}", path.display());
                None
            }
        }
    }
}
