// src/domain/listing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spreadsheets::table::{Cell, Column, ColumnKind, DatasetRow};

/// One archived listing card exactly as it was rendered on the page.
///
/// The index is assigned once by the archiver and is the key shared by both
/// derived record types.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCardSnapshot {
    pub index: usize,
    pub raw_markup: String,
    pub captured_at: DateTime<Utc>,
}

/// A listing projected out of the card's embedded JSON-LD block.
///
/// Serde names are the dataset column headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredListingRecord {
    pub index: usize,
    #[serde(rename = "title")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "address")]
    pub street_address: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    #[serde(rename = "propertyType")]
    pub property_type: Option<String>,
    #[serde(rename = "postedBy")]
    pub seller_type: Option<String>,
    #[serde(rename = "sellerName")]
    pub seller_name: Option<String>,
    pub url: Option<String>,
}

/// A listing recovered from the card markup itself.
///
/// Price fields hold cleaned text; turning them into numbers is left to the
/// consumer of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkupListingRecord {
    pub index: usize,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Price (INR)")]
    pub price_text: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Carpet Area")]
    pub carpet_area: Option<String>,
    #[serde(rename = "Super Area")]
    pub super_area: Option<String>,
    #[serde(rename = "Transaction")]
    pub transaction_type: Option<String>,
    #[serde(rename = "Furnishing")]
    pub furnishing: Option<String>,
    #[serde(rename = "Bathroom")]
    pub bathroom_count: Option<String>,
    #[serde(rename = "Possession")]
    pub possession_text: Option<String>,
    #[serde(rename = "Car Parking")]
    pub car_parking: Option<String>,
    #[serde(rename = "Price per Sqft")]
    pub price_per_area: Option<String>,
    #[serde(rename = "Society")]
    pub society: Option<String>,
}

impl MarkupListingRecord {
    /// All-null row kept for a card whose markup could not be processed.
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty(self.index)
    }
}

const STRUCTURED_COLUMNS: &[Column] = &[
    Column::new("index", ColumnKind::Integer),
    Column::new("title", ColumnKind::Text),
    Column::new("description", ColumnKind::Text),
    Column::new("address", ColumnKind::Text),
    Column::new("locality", ColumnKind::Text),
    Column::new("region", ColumnKind::Text),
    Column::new("latitude", ColumnKind::Real),
    Column::new("longitude", ColumnKind::Real),
    Column::new("price", ColumnKind::Real),
    Column::new("currency", ColumnKind::Text),
    Column::new("propertyType", ColumnKind::Text),
    Column::new("postedBy", ColumnKind::Text),
    Column::new("sellerName", ColumnKind::Text),
    Column::new("url", ColumnKind::Text),
];

const MARKUP_COLUMNS: &[Column] = &[
    Column::new("index", ColumnKind::Integer),
    Column::new("Title", ColumnKind::Text),
    Column::new("Price (INR)", ColumnKind::Text),
    Column::new("Description", ColumnKind::Text),
    Column::new("Carpet Area", ColumnKind::Text),
    Column::new("Super Area", ColumnKind::Text),
    Column::new("Transaction", ColumnKind::Text),
    Column::new("Furnishing", ColumnKind::Text),
    Column::new("Bathroom", ColumnKind::Text),
    Column::new("Possession", ColumnKind::Text),
    Column::new("Car Parking", ColumnKind::Text),
    Column::new("Price per Sqft", ColumnKind::Text),
    Column::new("Society", ColumnKind::Text),
];

impl DatasetRow for StructuredListingRecord {
    const COLUMNS: &'static [Column] = STRUCTURED_COLUMNS;

    fn index(&self) -> usize {
        self.index
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(self.index as i64),
            Cell::Text(self.name.clone()),
            Cell::Text(self.description.clone()),
            Cell::Text(self.street_address.clone()),
            Cell::Text(self.locality.clone()),
            Cell::Text(self.region.clone()),
            Cell::Real(self.latitude),
            Cell::Real(self.longitude),
            Cell::Real(self.price),
            Cell::Text(self.currency.clone()),
            Cell::Text(self.property_type.clone()),
            Cell::Text(self.seller_type.clone()),
            Cell::Text(self.seller_name.clone()),
            Cell::Text(self.url.clone()),
        ]
    }
}

impl DatasetRow for MarkupListingRecord {
    const COLUMNS: &'static [Column] = MARKUP_COLUMNS;

    fn index(&self) -> usize {
        self.index
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Integer(self.index as i64),
            Cell::Text(self.title.clone()),
            Cell::Text(self.price_text.clone()),
            Cell::Text(self.description.clone()),
            Cell::Text(self.carpet_area.clone()),
            Cell::Text(self.super_area.clone()),
            Cell::Text(self.transaction_type.clone()),
            Cell::Text(self.furnishing.clone()),
            Cell::Text(self.bathroom_count.clone()),
            Cell::Text(self.possession_text.clone()),
            Cell::Text(self.car_parking.clone()),
            Cell::Text(self.price_per_area.clone()),
            Cell::Text(self.society.clone()),
        ]
    }
}
