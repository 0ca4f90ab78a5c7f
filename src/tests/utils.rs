use tempfile::TempDir;

use crate::archive::SnapshotStore;
use crate::config::PipelineConfig;
use crate::db::{init_db, Database};

/// A config rooted in a fresh temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub fn temp_config() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = PipelineConfig::new(dir.path().join("data"), dir.path().join("listings.sqlite3"));
    (dir, config)
}

pub fn temp_store() -> (TempDir, SnapshotStore) {
    let (dir, config) = temp_config();
    let store = SnapshotStore::new(&config.layout);
    (dir, store)
}

/// Initialize a fresh test DB using the production schema
pub fn init_test_db(config: &PipelineConfig) -> Database {
    let db = Database::new(config.db_path.clone());
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    db
}

pub fn json_ld(body: &str) -> String {
    format!(r#"<script type="application/ld+json">{body}</script>"#)
}

pub const APARTMENT_JSON_LD: &str = r#"{
    "@context": "https://schema.org",
    "@type": "Apartment",
    "name": "3 BHK Flat for Sale in Kondapur",
    "description": "East facing flat close to the metro",
    "url": "https://www.magicbricks.com/propertyDetails/3-BHK-Kondapur",
    "address": {
        "@type": "PostalAddress",
        "streetAddress": "Botanical Garden Road",
        "addressLocality": "Kondapur",
        "addressRegion": "Hyderabad"
    },
    "geo": {"@type": "GeoCoordinates", "latitude": "17.4690", "longitude": 78.3560},
    "offers": {"@type": "Offer", "price": "12500000", "priceCurrency": "INR"},
    "seller": {"@type": "RealEstateAgent", "name": "Sri Homes"}
}"#;

/// A listing card shaped like the ones the search results page renders.
pub fn card_markup(title: &str, structured: Option<&str>) -> String {
    let script = structured.map(json_ld).unwrap_or_default();
    format!(
        r#"<div class="mb-srp__card">
    {script}
    <h2 class="mb-srp__card--title">{title}</h2>
    <div class="mb-srp__card__price">
        <div class="mb-srp__card__price--amount">₹1,23,456</div>
        <div class="mb-srp__card__price--size">₹6,500</div>
    </div>
    <div class="mb-srp__card__summary__list">
        <div class="mb-srp__card__summary__list--item">
            <div class="mb-srp__card__summary--label">Carpet Area</div>
            <div class="mb-srp__card__summary--value">1450 sqft</div>
        </div>
        <div class="mb-srp__card__summary__list--item">
            <div class="mb-srp__card__summary--label">Transaction</div>
            <div class="mb-srp__card__summary--value">Resale</div>
        </div>
        <div class="mb-srp__card__summary__list--item">
            <div class="mb-srp__card__summary--label">Furnishing</div>
            <div class="mb-srp__card__summary--value">Semi-Furnished</div>
        </div>
        <div class="mb-srp__card__summary__list--item">
            <div class="mb-srp__card__summary--label">Bathroom</div>
            <div class="mb-srp__card__summary--value">3</div>
        </div>
    </div>
    <div class="mb-srp__card--desc--text"><p>Well ventilated   flat near the IT corridor</p></div>
    <a class="mb-srp__card__society--name" href="/society">My Home Avatar</a>
</div>"#
    )
}

/// A card for a property still being built.
pub fn under_construction_card(title: &str) -> String {
    format!(
        r#"<div class="mb-srp__card">
    <h2 class="mb-srp__card--title">{title}</h2>
    <div class="mb-srp__card__summary__list">
        <div class="mb-srp__card__summary__list--item">
            <div class="mb-srp__card__summary--label">Status</div>
            <div class="mb-srp__card__summary--value">Under Construction</div>
        </div>
    </div>
    <div class="mb-srp__card__possession">Poss. by Dec '26</div>
</div>"#
    )
}
