use std::sync::LazyLock;

use regex::Regex;

use crate::models::ContentReference;

/// Matches inline content tags like `[GHOST:oiwa]`. Case-sensitive; the id is
/// any run of characters up to the closing bracket.
static CONTENT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(GHOST|STORY|MOVIE|MYTH):([^\]]+)\]").expect("content tag regex is valid")
});

/// Extracts inline content references from generated twin text
///
/// References come back in the order they appear in the text; duplicates are
/// preserved. The `GHOST` tag maps to the `ghost_entity` content type, the
/// rest are just the lower-cased tag name.
pub fn extract_content_references(text: &str) -> Vec<ContentReference> {
    CONTENT_TAG_RE
        .captures_iter(text)
        .map(|caps| {
            let tag = &caps[1];
            let content_type = if tag == "GHOST" {
                format!("{}_entity", tag.to_lowercase())
            } else {
                tag.to_lowercase()
            };

            ContentReference {
                content_type,
                content_id: caps[2].to_string(),
            }
        })
        .collect()
}
