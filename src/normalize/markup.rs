// normalize/markup.rs
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use rayon::prelude::*;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, trace, warn};

use crate::archive::SnapshotStore;
use crate::cancel::CancelToken;
use crate::config::ExtractionContext;
use crate::domain::listing::{ListingCardSnapshot, MarkupListingRecord};
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};
use crate::normalize::numeric::clean_numeric_text;

const SUMMARY_LIST: &str = "div.mb-srp__card__summary__list";
const SUMMARY_ITEM: &str = "div.mb-srp__card__summary__list--item";
const SUMMARY_LABEL: &str = "div.mb-srp__card__summary--label";
const SUMMARY_VALUE: &str = "div.mb-srp__card__summary--value";
const POSSESSION_HINT: &str = "Poss.";

/// A parsed card plus the label -> value pairs from its summary list.
pub struct CardDom<'a> {
    raw: &'a str,
    doc: Html,
    summary: HashMap<String, String>,
}

impl<'a> CardDom<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let doc = Html::parse_fragment(raw);
        let summary = summary_pairs(&doc);
        Self { raw, doc, summary }
    }

    /// Whitespace-collapsed text of the first element matching `css`.
    pub fn select_text(&self, css: &str) -> Option<String> {
        let selector = Selector::parse(css).ok()?;
        self.doc
            .select(&selector)
            .next()
            .and_then(|el| element_text(&el))
    }

    pub fn summary(&self, label: &str) -> Option<String> {
        self.summary.get(label).cloned()
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.raw.contains(marker)
    }

    /// First `div` whose own text (not its children's) contains `needle`.
    fn div_with_own_text(&self, needle: &str) -> Option<String> {
        let selector = Selector::parse("div").ok()?;
        self.doc
            .select(&selector)
            .find(|el| {
                let own: String = el
                    .children()
                    .filter_map(|node| node.value().as_text().map(|t| t.text.to_string()))
                    .collect();
                own.contains(needle)
            })
            .and_then(|el| element_text(&el))
    }
}

fn summary_pairs(doc: &Html) -> HashMap<String, String> {
    let (Ok(list), Ok(item), Ok(label), Ok(value)) = (
        Selector::parse(SUMMARY_LIST),
        Selector::parse(SUMMARY_ITEM),
        Selector::parse(SUMMARY_LABEL),
        Selector::parse(SUMMARY_VALUE),
    ) else {
        return HashMap::new();
    };

    let Some(container) = doc.select(&list).next() else {
        return HashMap::new();
    };

    container
        .select(&item)
        .filter_map(|entry| {
            let key = entry.select(&label).next().and_then(|el| element_text(&el))?;
            let val = entry.select(&value).next().and_then(|el| element_text(&el))?;
            Some((key, val))
        })
        .collect()
}

fn element_text(el: &ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// One extraction rule: `None` means "try the next rule".
pub type Rule = fn(&CardDom<'_>, &ExtractionContext) -> Option<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupField {
    Title,
    Price,
    Description,
    CarpetArea,
    SuperArea,
    Transaction,
    Furnishing,
    Bathroom,
    Possession,
    CarParking,
    PricePerArea,
    Society,
}

impl MarkupField {
    fn assign(self, record: &mut MarkupListingRecord, value: Option<String>) {
        let slot = match self {
            MarkupField::Title => &mut record.title,
            MarkupField::Price => &mut record.price_text,
            MarkupField::Description => &mut record.description,
            MarkupField::CarpetArea => &mut record.carpet_area,
            MarkupField::SuperArea => &mut record.super_area,
            MarkupField::Transaction => &mut record.transaction_type,
            MarkupField::Furnishing => &mut record.furnishing,
            MarkupField::Bathroom => &mut record.bathroom_count,
            MarkupField::Possession => &mut record.possession_text,
            MarkupField::CarParking => &mut record.car_parking,
            MarkupField::PricePerArea => &mut record.price_per_area,
            MarkupField::Society => &mut record.society,
        };
        *slot = value;
    }
}

/// Field -> ordered rules. The first rule that yields a value wins.
pub const FIELD_RULES: &[(MarkupField, &[Rule])] = &[
    (
        MarkupField::Title,
        &[
            |card, _| card.select_text("h2.mb-srp__card--title"),
            |card, _| card.select_text(".mb-srp__card--title"),
        ],
    ),
    (
        MarkupField::Price,
        &[|card, ctx| {
            card.select_text("div.mb-srp__card__price--amount")
                .and_then(|t| clean_numeric_text(&t, ctx))
        }],
    ),
    (
        MarkupField::Description,
        &[
            |card, _| card.select_text("div.mb-srp__card--desc--text p"),
            |card, _| card.select_text("div.mb-srp__card--desc--text"),
        ],
    ),
    (MarkupField::CarpetArea, &[|card, _| card.summary("Carpet Area")]),
    (MarkupField::SuperArea, &[|card, _| card.summary("Super Area")]),
    (MarkupField::Transaction, &[|card, _| card.summary("Transaction")]),
    (MarkupField::Furnishing, &[|card, _| card.summary("Furnishing")]),
    (MarkupField::Bathroom, &[|card, _| card.summary("Bathroom")]),
    (
        MarkupField::Possession,
        &[|card, ctx| {
            if card.contains(&ctx.possession_marker) {
                card.div_with_own_text(POSSESSION_HINT)
            } else {
                None
            }
        }],
    ),
    (MarkupField::CarParking, &[|card, _| card.summary("Car Parking")]),
    (
        MarkupField::PricePerArea,
        &[|card, ctx| {
            card.select_text("div.mb-srp__card__price--size")
                .and_then(|t| clean_numeric_text(&t, ctx))
        }],
    ),
    (
        MarkupField::Society,
        &[
            |card, _| card.select_text("a.mb-srp__card__society--name"),
            |card, _| card.summary("Society"),
        ],
    ),
];

pub fn first_match(rules: &[Rule], card: &CardDom<'_>, ctx: &ExtractionContext) -> Option<String> {
    rules.iter().find_map(|rule| rule(card, ctx))
}

/// Run every field's rules over one card's markup.
pub fn extract_features(index: usize, raw: &str, ctx: &ExtractionContext) -> MarkupListingRecord {
    let card = CardDom::parse(raw);
    let mut record = MarkupListingRecord::empty(index);
    for (field, rules) in FIELD_RULES {
        field.assign(&mut record, first_match(rules, &card, ctx));
    }
    record
}

#[derive(Debug, Default)]
pub struct MarkupOutcome {
    pub records: Vec<MarkupListingRecord>,
    /// Cards that fell back to an all-null row.
    pub failed: usize,
}

/// Builds the markup dataset: exactly one row per archived snapshot.
pub struct MarkupFeatureExtractor<'a> {
    store: &'a SnapshotStore,
    ctx: &'a ExtractionContext,
}

impl<'a> MarkupFeatureExtractor<'a> {
    pub fn new(store: &'a SnapshotStore, ctx: &'a ExtractionContext) -> Self {
        Self { store, ctx }
    }

    pub fn run(&self, cancel: &CancelToken) -> PipelineResult<MarkupOutcome> {
        let files = self
            .store
            .markup_files()
            .map_err(|e| PipelineError::persist(Stage::Extract, None, e))?;
        info!("Parsing {} HTML cards", files.len());

        let rows = files
            .par_iter()
            .map(|(index, path)| {
                cancel.check()?;
                Ok(match self.extract_file(*index, path) {
                    Ok(record) => (record, false),
                    Err(e) => {
                        warn!("Failed to parse HTML block: {e}");
                        (MarkupListingRecord::empty(*index), true)
                    }
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut outcome = MarkupOutcome::default();
        for (record, failed) in rows {
            outcome.failed += usize::from(failed);
            outcome.records.push(record);
        }

        let blank = outcome.records.iter().filter(|r| r.is_empty()).count();
        info!(
            "Parsed {} HTML cards ({} failed, {} with no recognised fields)",
            outcome.records.len(),
            outcome.failed,
            blank.saturating_sub(outcome.failed)
        );
        Ok(outcome)
    }

    fn extract_file(&self, index: usize, path: &Path) -> PipelineResult<MarkupListingRecord> {
        let snapshot = self
            .store
            .read_snapshot(index, path)
            .map_err(|e| PipelineError::parse(Some(index), format!("read failed: {e}")))?;
        trace!("Card {index} captured at {}", snapshot.captured_at);
        extract_snapshot(&snapshot, self.ctx)
    }
}

/// Extract one snapshot, turning a panic in the parser into a `Parse` error
/// for that card only.
pub fn extract_snapshot(
    snapshot: &ListingCardSnapshot,
    ctx: &ExtractionContext,
) -> PipelineResult<MarkupListingRecord> {
    if snapshot.raw_markup.trim().is_empty() {
        return Err(PipelineError::parse(Some(snapshot.index), "empty snapshot"));
    }

    panic::catch_unwind(AssertUnwindSafe(|| {
        extract_features(snapshot.index, &snapshot.raw_markup, ctx)
    }))
    .map_err(|_| PipelineError::parse(Some(snapshot.index), "HTML extraction panicked"))
}
