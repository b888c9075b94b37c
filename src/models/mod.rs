use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The four kinds of content the encyclopedia serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    GhostEntity,
    Story,
    Movie,
    Myth,
}

impl ContentType {
    /// Cycling order used by the fallback recommendation path
    pub const ALL: [ContentType; 4] = [
        ContentType::GhostEntity,
        ContentType::Story,
        ContentType::Movie,
        ContentType::Myth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::GhostEntity => "ghost_entity",
            ContentType::Story => "story",
            ContentType::Movie => "movie",
            ContentType::Myth => "myth",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's stated paranormal tastes
///
/// Supplied by the caller on every request and never persisted here. Any
/// subset of fields may be present on the wire; missing fields fall back to
/// empty lists and a middle-of-the-road spookiness of 3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferenceProfile {
    #[serde(default)]
    pub favorite_ghost_types: Vec<String>,
    #[serde(default)]
    pub preferred_content_types: Vec<String>,
    #[serde(default)]
    pub cultural_interests: Vec<String>,
    /// Comfort level from 1 (tame) to 5 (terrifying)
    #[serde(default = "default_spookiness_level")]
    pub spookiness_level: u8,
}

fn default_spookiness_level() -> u8 {
    3
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            favorite_ghost_types: Vec::new(),
            preferred_content_types: Vec::new(),
            cultural_interests: Vec::new(),
            spookiness_level: default_spookiness_level(),
        }
    }
}

/// One past user action on a piece of content
///
/// The timestamp is expected to be ISO-8601 but is carried opaquely, not
/// validated. Histories arrive most-recent-last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub interaction_type: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One entry of the recent-message window passed into context assembly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// "user" or "assistant"
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

/// A single ranked recommendation produced by the engine
///
/// List order is rank order. Scores are expected in [0.0, 1.0] but are
/// accepted from the generation endpoint as-is, without clamping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub content_id: String,
    pub content_type: ContentType,
    pub score: f64,
    pub reasoning: String,
}

/// A content item referenced inline by generated twin text
///
/// Duplicates are preserved in the order they appear in the text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentReference {
    pub content_type: String,
    pub content_id: String,
}

/// Conversation context the caller hands to the digital twin
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwinContext {
    #[serde(default)]
    pub user_preferences: Option<PreferenceProfile>,
    #[serde(default)]
    pub recent_messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub recent_interactions: Vec<InteractionRecord>,
}

/// One reply from the digital twin, degraded or not
///
/// Generation failures never surface as errors; they come back as a reply
/// with `success = false` and a short machine-readable `error` reason.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TwinReply {
    pub response: String,
    pub content_references: Vec<ContentReference>,
    /// Wall-clock seconds spent on the generation call
    pub response_time: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
