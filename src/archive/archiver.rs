// archive/archiver.rs
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::archive::json_ld::{find_json_ld, JsonLdBlock};
use crate::archive::store::SnapshotStore;
use crate::cancel::CancelToken;
use crate::domain::run::Stage;
use crate::errors::{PipelineError, PipelineResult};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub snapshots: usize,
    pub structured_blocks: usize,
    pub malformed_blocks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardOutcome {
    MarkupOnly,
    WithStructured,
    MalformedBlock,
}

/// Turns collected card markup into indexed snapshot files.
pub struct CardArchiver {
    store: SnapshotStore,
}

impl CardArchiver {
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// Archive every card under its position in `cards` (0-based).
    ///
    /// Cards are written into staging directories that replace the live
    /// archive only once every card is on disk, so a cancelled or failed run
    /// leaves the previous archive as it was. A malformed JSON-LD block only
    /// costs that card its structured file; a write failure ends the stage.
    pub fn archive(&self, cards: &[String], cancel: &CancelToken) -> PipelineResult<ArchiveReport> {
        cancel.check()?;

        let staging = self.store.staging();
        let removed = staging
            .reset()
            .map_err(|e| PipelineError::persist(Stage::Archive, None, e))?;
        if removed > 0 {
            debug!("Removed {removed} staged files left by an interrupted run");
        }

        info!("Archiving {} cards", cards.len());

        let staged = self.stage_cards(&staging, cards, cancel).and_then(|outcomes| {
            cancel.check()?;
            self.store
                .promote(&staging)
                .map_err(|e| PipelineError::persist(Stage::Archive, None, e))?;
            Ok(outcomes)
        });
        let outcomes = match staged {
            Ok(outcomes) => outcomes,
            Err(e) => {
                if let Err(cleanup) = staging.discard() {
                    warn!("Could not remove staged snapshots: {cleanup}");
                }
                return Err(e);
            }
        };

        let mut report = ArchiveReport {
            snapshots: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                CardOutcome::WithStructured => report.structured_blocks += 1,
                CardOutcome::MalformedBlock => report.malformed_blocks += 1,
                CardOutcome::MarkupOnly => {}
            }
        }

        info!(
            "Archived {} cards ({} with structured data, {} malformed blocks)",
            report.snapshots, report.structured_blocks, report.malformed_blocks
        );
        Ok(report)
    }

    fn stage_cards(
        &self,
        staging: &SnapshotStore,
        cards: &[String],
        cancel: &CancelToken,
    ) -> PipelineResult<Vec<CardOutcome>> {
        cards
            .par_iter()
            .enumerate()
            .map(|(index, markup)| {
                cancel.check()?;
                archive_card(staging, index, markup)
            })
            .collect()
    }
}

fn archive_card(store: &SnapshotStore, index: usize, markup: &str) -> PipelineResult<CardOutcome> {
    store
        .write_markup(index, markup)
        .map_err(|e| PipelineError::persist(Stage::Archive, Some(index), e))?;

    let outcome = match find_json_ld(markup) {
        Ok(JsonLdBlock::Valid(block)) => {
            store
                .write_structured(index, &block)
                .map_err(|e| PipelineError::persist(Stage::Archive, Some(index), e))?;
            CardOutcome::WithStructured
        }
        Ok(JsonLdBlock::Malformed(msg)) => {
            warn!("Error parsing JSON-LD for card {index}: {msg}");
            CardOutcome::MalformedBlock
        }
        Ok(JsonLdBlock::Absent) => CardOutcome::MarkupOnly,
        Err(e) => {
            warn!("Could not search card {index} for JSON-LD: {e}");
            CardOutcome::MalformedBlock
        }
    };

    debug!("Saved card {index}");
    Ok(outcome)
}
