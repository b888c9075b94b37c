use crate::models::TwinContext;

/// How many trailing messages and interactions make it into the prompt
const MESSAGE_WINDOW: usize = 5;
const INTERACTION_WINDOW: usize = 5;

/// Each quoted message is cut to this many characters
const MESSAGE_PREVIEW_CHARS: usize = 100;

/// Builds the bounded natural-language context block for twin prompts
///
/// Three optional sections: user preferences, recent conversation, recent
/// activity. A section whose source data is empty is omitted entirely. The
/// spookiness line is always emitted when the preferences block is present,
/// falling back to the default level of 3.
pub fn assemble_context(context: &TwinContext) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(preferences) = &context.user_preferences {
        parts.push("User Preferences:".to_string());
        if !preferences.favorite_ghost_types.is_empty() {
            parts.push(format!(
                "- Interested in: {}",
                preferences.favorite_ghost_types.join(", ")
            ));
        }
        if !preferences.cultural_interests.is_empty() {
            parts.push(format!(
                "- Cultural interests: {}",
                preferences.cultural_interests.join(", ")
            ));
        }
        parts.push(format!(
            "- Comfort with spookiness: {}/5",
            preferences.spookiness_level
        ));
    }

    if !context.recent_messages.is_empty() {
        parts.push("\nRecent Conversation:".to_string());
        let skip = context.recent_messages.len().saturating_sub(MESSAGE_WINDOW);
        for turn in &context.recent_messages[skip..] {
            parts.push(format!("{}: {}", capitalize(&turn.role), preview(&turn.content)));
        }
    }

    if !context.recent_interactions.is_empty() {
        parts.push("\nRecent Activity:".to_string());
        let skip = context
            .recent_interactions
            .len()
            .saturating_sub(INTERACTION_WINDOW);
        for interaction in &context.recent_interactions[skip..] {
            parts.push(format!(
                "- {} {}",
                interaction.interaction_type, interaction.content_type
            ));
        }
    }

    parts.join("\n")
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// First 100 characters of a message, cut on a char boundary
fn preview(content: &str) -> String {
    content.chars().take(MESSAGE_PREVIEW_CHARS).collect()
}
