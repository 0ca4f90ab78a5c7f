// collector/scroll.rs
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::cancel::CancelToken;
use crate::errors::PipelineResult;

/// The parts of a live listing page the scroll loop needs.
///
/// Implemented by the Chrome session; tests drive the loop with a scripted
/// page instead.
pub trait ListingPage {
    fn page_height(&self) -> PipelineResult<u64>;

    fn scroll_to_bottom(&self) -> PipelineResult<()>;

    /// Outer HTML of every card currently in the DOM.
    fn card_markup(&self, selector: &str) -> PipelineResult<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Scrolling { scrolls: usize },
    /// Height stopped changing; no more content is coming.
    Stable { scrolls: usize },
    /// Scroll budget used up before the page settled.
    Exhausted { scrolls: usize },
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub cards: Vec<String>,
    pub state: CollectorState,
}

impl Collection {
    pub fn scrolls(&self) -> usize {
        match self.state {
            CollectorState::Scrolling { scrolls }
            | CollectorState::Stable { scrolls }
            | CollectorState::Exhausted { scrolls } => scrolls,
        }
    }
}

/// Ordered set of unique card markup.
///
/// Virtualized result lists drop old cards from the DOM as new ones render,
/// so every batch seen during the session is merged here.
#[derive(Default)]
struct Fingerprints {
    seen: HashSet<[u8; 32]>,
    cards: Vec<String>,
}

impl Fingerprints {
    fn absorb(&mut self, batch: Vec<String>) -> usize {
        let before = self.cards.len();
        for markup in batch {
            let digest: [u8; 32] = Sha256::digest(markup.as_bytes()).into();
            if self.seen.insert(digest) {
                self.cards.push(markup);
            }
        }
        self.cards.len() - before
    }
}

pub struct ScrollCollector {
    scroll_pause: Duration,
    max_scrolls: usize,
    card_selector: String,
}

impl ScrollCollector {
    pub fn new(scroll_pause: Duration, max_scrolls: usize, card_selector: impl Into<String>) -> Self {
        Self {
            scroll_pause,
            max_scrolls,
            card_selector: card_selector.into(),
        }
    }

    /// Scroll until the page height settles or the budget runs out.
    ///
    /// Page errors are returned as-is and end the collection.
    pub fn collect<P: ListingPage>(
        &self,
        page: &P,
        cancel: &CancelToken,
    ) -> PipelineResult<Collection> {
        let mut fingerprints = Fingerprints::default();

        let mut last_height = page.page_height()?;
        let initial = fingerprints.absorb(page.card_markup(&self.card_selector)?);
        info!("Page loaded: {initial} cards rendered, height {last_height}");
        let mut state = CollectorState::Scrolling { scrolls: 0 };

        while let CollectorState::Scrolling { scrolls } = state {
            if scrolls >= self.max_scrolls {
                state = CollectorState::Exhausted { scrolls };
                break;
            }
            cancel.check()?;

            page.scroll_to_bottom()?;
            thread::sleep(self.scroll_pause);

            let fresh = fingerprints.absorb(page.card_markup(&self.card_selector)?);
            let height = page.page_height()?;
            let scrolls = scrolls + 1;
            info!(
                "Scrolling...{scrolls}/{}: height {height}, {fresh} new cards ({} total)",
                self.max_scrolls,
                fingerprints.cards.len()
            );

            state = if height == last_height {
                info!("No more new content loaded on scroll");
                CollectorState::Stable { scrolls }
            } else {
                last_height = height;
                CollectorState::Scrolling { scrolls }
            };
        }

        if let CollectorState::Exhausted { scrolls } = state {
            info!("Scroll limit reached after {scrolls} scrolls; page may hold more cards");
        }
        info!("Total unique cards found: {}", fingerprints.cards.len());

        Ok(Collection {
            cards: fingerprints.cards,
            state,
        })
    }
}
