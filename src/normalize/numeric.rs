use serde_json::Value;

use crate::config::ExtractionContext;

/// Strip currency glyphs and digit-group separators, read space variants as
/// plain spaces, then trim.
///
/// Returns `None` when nothing is left.
pub fn clean_numeric_text(raw: &str, ctx: &ExtractionContext) -> Option<String> {
    let mut text = raw.to_string();
    for glyph in &ctx.currency_glyphs {
        text = text.replace(glyph.as_str(), "");
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !ctx.digit_separators.contains(c))
        .map(|c| if ctx.space_variants.contains(&c) { ' ' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Parse cleaned text as a number; anything else becomes `None`.
pub fn coerce_number(raw: &str, ctx: &ExtractionContext) -> Option<f64> {
    clean_numeric_text(raw, ctx)?
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// JSON-LD numbers show up both as numbers and as strings.
pub fn number_from_json(value: &Value, ctx: &ExtractionContext) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => coerce_number(s, ctx),
        _ => None,
    }
}
