use std::cell::Cell;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::collector::{CollectorState, ListingPage, ScrollCollector};
use crate::errors::{PipelineError, PipelineResult};

const SELECTOR: &str = "div.mb-srp__card";

/// A page that replays a fixed script: one height and one DOM batch per
/// scroll position. The last entry repeats once the script runs out.
struct ScriptedPage {
    heights: Vec<u64>,
    batches: Vec<Vec<String>>,
    position: Cell<usize>,
    fail_scroll_at: Option<usize>,
}

impl ScriptedPage {
    fn new(heights: &[u64], batches: &[&[&str]]) -> Self {
        Self {
            heights: heights.to_vec(),
            batches: batches
                .iter()
                .map(|b| b.iter().map(|s| s.to_string()).collect())
                .collect(),
            position: Cell::new(0),
            fail_scroll_at: None,
        }
    }

    fn at<T: Clone>(&self, items: &[T]) -> T {
        let i = self.position.get().min(items.len() - 1);
        items[i].clone()
    }
}

impl ListingPage for ScriptedPage {
    fn page_height(&self) -> PipelineResult<u64> {
        Ok(self.at(&self.heights))
    }

    fn scroll_to_bottom(&self) -> PipelineResult<()> {
        if self.fail_scroll_at == Some(self.position.get()) {
            return Err(PipelineError::Fetch("tab crashed".into()));
        }
        self.position.set(self.position.get() + 1);
        Ok(())
    }

    fn card_markup(&self, selector: &str) -> PipelineResult<Vec<String>> {
        assert_eq!(selector, SELECTOR);
        Ok(self.at(&self.batches))
    }
}

fn collector(max_scrolls: usize) -> ScrollCollector {
    ScrollCollector::new(Duration::ZERO, max_scrolls, SELECTOR)
}

#[test]
fn stops_when_height_stops_changing() {
    let page = ScriptedPage::new(&[100, 200, 200], &[&["a"], &["a", "b"], &["a", "b"]]);

    let collection = collector(10).collect(&page, &CancelToken::new()).unwrap();

    assert_eq!(collection.state, CollectorState::Stable { scrolls: 2 });
    assert_eq!(collection.scrolls(), 2);
    assert_eq!(collection.cards, vec!["a", "b"]);
}

#[test]
fn merges_overlapping_batches_in_first_seen_order() {
    // Virtualized list: older cards leave the DOM as new ones arrive.
    let page = ScriptedPage::new(
        &[100, 200, 300, 300],
        &[&["a", "b"], &["b", "c"], &["c", "d"], &["c", "d"]],
    );

    let collection = collector(10).collect(&page, &CancelToken::new()).unwrap();

    assert_eq!(collection.cards, vec!["a", "b", "c", "d"]);
    assert_eq!(collection.state, CollectorState::Stable { scrolls: 3 });
}

#[test]
fn duplicate_markup_within_a_batch_is_kept_once() {
    let page = ScriptedPage::new(&[100, 100], &[&["a", "a", "b"]]);

    let collection = collector(5).collect(&page, &CancelToken::new()).unwrap();

    assert_eq!(collection.cards, vec!["a", "b"]);
}

#[test]
fn scroll_budget_bounds_the_session() {
    let page = ScriptedPage::new(&[100, 200, 300, 400, 500], &[&["a"], &["b"], &["c"], &["d"]]);

    let collection = collector(3).collect(&page, &CancelToken::new()).unwrap();

    assert_eq!(collection.state, CollectorState::Exhausted { scrolls: 3 });
    assert_eq!(collection.cards, vec!["a", "b", "c", "d"]);
}

#[test]
fn empty_page_yields_no_cards() {
    let page = ScriptedPage::new(&[800], &[&[]]);

    let collection = collector(10).collect(&page, &CancelToken::new()).unwrap();

    assert!(collection.cards.is_empty());
    assert_eq!(collection.state, CollectorState::Stable { scrolls: 1 });
}

#[test]
fn cancel_stops_before_the_next_scroll() {
    let page = ScriptedPage::new(&[100, 200, 300], &[&["a"], &["b"], &["c"]]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = collector(10).collect(&page, &cancel);

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(page.position.get(), 0, "no scroll after cancel");
}

#[test]
fn page_errors_end_the_collection() {
    let mut page = ScriptedPage::new(&[100, 200, 300], &[&["a"], &["b"], &["c"]]);
    page.fail_scroll_at = Some(1);

    let result = collector(10).collect(&page, &CancelToken::new());

    assert!(matches!(result, Err(PipelineError::Fetch(_))));
}
