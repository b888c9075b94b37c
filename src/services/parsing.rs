use serde_json::Value;

use crate::models::Recommendation;

/// Parses raw model output into recommendation records
///
/// The model is instructed to return a bare JSON array, but real responses
/// often arrive wrapped in a markdown code fence. Anything that cannot be
/// parsed, or parses to something other than an array, counts as zero
/// recommendations; callers fall back rather than fail. Elements missing any
/// of the four required fields are dropped individually.
pub fn parse_recommendations(raw: &str) -> Vec<Recommendation> {
    let text = strip_code_fence(raw);

    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return Vec::new();
    };

    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Recommendation>(item).ok())
        .collect()
}

/// Removes a surrounding markdown code fence, including an optional `json`
/// language tag on the opening fence.
fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text;
    }

    let mut inner = text.split("```").nth(1).unwrap_or_default();
    if let Some(stripped) = inner.strip_prefix("json") {
        inner = stripped;
    }
    inner.trim()
}
