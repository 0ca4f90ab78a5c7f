use scraper::{Html, Selector};
use serde_json::Value;

use crate::errors::{PipelineError, PipelineResult};

const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// Outcome of looking for the embedded structured-data block in one card.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonLdBlock {
    Absent,
    Valid(Value),
    Malformed(String),
}

/// Find the first JSON-LD script in a card and try to parse it.
pub fn find_json_ld(markup: &str) -> PipelineResult<JsonLdBlock> {
    let fragment = Html::parse_fragment(markup);
    let selector = Selector::parse(JSON_LD_SELECTOR)
        .map_err(|e| PipelineError::parse(None, format!("bad JSON-LD selector: {e}")))?;

    let Some(script) = fragment.select(&selector).next() else {
        return Ok(JsonLdBlock::Absent);
    };

    let body: String = script.text().collect();
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(value) => Ok(JsonLdBlock::Valid(value)),
        Err(e) => Ok(JsonLdBlock::Malformed(e.to_string())),
    }
}
