mod browser;
mod scroll;

pub use browser::collect_listings;
pub use scroll::{CollectorState, ListingPage, ScrollCollector};
