use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CacheKey, RecommendationCache};
use crate::models::{ContentType, InteractionRecord, PreferenceProfile, Recommendation};
use crate::services::parsing::parse_recommendations;
use crate::services::providers::{GenerationOptions, TextGenerator};

/// Number of trailing interactions summarized into the personalized prompt
const HISTORY_WINDOW: usize = 10;

/// Fallback list scoring: 0.7 for rank 0, minus 0.05 per rank
const FALLBACK_TOP_SCORE: f64 = 0.7;
const FALLBACK_SCORE_STEP: f64 = 0.05;

/// Candidate lists spanning at least this many content types pass through
/// diversity balancing unchanged
const DIVERSITY_TARGET: usize = 3;

/// LLM-backed recommendation engine with per-user caching
///
/// Picks a cold-start or personalized prompt, delegates to the configured
/// `TextGenerator`, parses the reply, balances content-type diversity, and
/// caches the result keyed on user and preference profile. Generation
/// problems never escape: an unusable reply degrades into deterministic
/// placeholder recommendations.
pub struct RecommendationEngine {
    generator: Arc<dyn TextGenerator>,
    cache: RecommendationCache,
}

impl RecommendationEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            cache: RecommendationCache::new(),
        }
    }

    /// Generates up to `limit` ranked recommendations for a user
    ///
    /// Cached results are returned unchanged, without re-ranking and without
    /// a second generation call. The cache key covers the preference profile
    /// only; interaction history is deliberately excluded, so a cached list
    /// may lag behind new history until the profile changes or the cache is
    /// invalidated. Never fails.
    pub async fn generate_recommendations(
        &self,
        user_id: &str,
        profile: &PreferenceProfile,
        history: &[InteractionRecord],
        limit: usize,
    ) -> Vec<Recommendation> {
        let key = CacheKey::new(user_id, profile);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(user_id = %user_id, key = %key, "Recommendation cache hit");
            return cached;
        }

        let candidates = if history.is_empty() {
            self.cold_start_recommendations(profile, limit).await
        } else {
            self.personalized_recommendations(profile, history, limit).await
        };

        let recommendations = ensure_diversity(candidates);

        tracing::info!(
            user_id = %user_id,
            count = recommendations.len(),
            cold_start = history.is_empty(),
            "Recommendations generated"
        );

        self.cache.put(key, recommendations.clone()).await;

        recommendations
    }

    /// Removes one user's cached recommendations, or everything when no user
    /// is given
    pub async fn invalidate_cache(&self, user_id: Option<&str>) {
        self.cache.invalidate(user_id).await;
        tracing::debug!(user_id = ?user_id, "Recommendation cache invalidated");
    }

    async fn cold_start_recommendations(
        &self,
        profile: &PreferenceProfile,
        limit: usize,
    ) -> Vec<Recommendation> {
        let prompt = cold_start_prompt(profile, limit);
        self.generate_or_fallback(&prompt, profile, limit).await
    }

    async fn personalized_recommendations(
        &self,
        profile: &PreferenceProfile,
        history: &[InteractionRecord],
        limit: usize,
    ) -> Vec<Recommendation> {
        let prompt = personalized_prompt(profile, history, limit);
        self.generate_or_fallback(&prompt, profile, limit).await
    }

    /// Single fallback policy: a failed call, unparseable output, or an empty
    /// validated list all become the deterministic placeholder list
    async fn generate_or_fallback(
        &self,
        prompt: &str,
        profile: &PreferenceProfile,
        limit: usize,
    ) -> Vec<Recommendation> {
        let parsed = match self
            .generator
            .generate(prompt, &GenerationOptions::default())
            .await
        {
            Ok(raw) => parse_recommendations(&raw),
            Err(e) => {
                tracing::warn!(error = %e, "Generation failed, using fallback recommendations");
                Vec::new()
            }
        };

        if parsed.is_empty() {
            return fallback_recommendations(profile, limit);
        }

        parsed.into_iter().take(limit).collect()
    }
}

fn join_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

fn cold_start_prompt(profile: &PreferenceProfile, limit: usize) -> String {
    format!(
        "You are a paranormal content recommendation expert. Generate {limit} diverse recommendations for a new user with these preferences:\n\
         \n\
         Favorite Ghost Types: {favorite_types}\n\
         Preferred Content Types: {preferred_content}\n\
         Cultural Interests: {cultural_interests}\n\
         Spookiness Level: {spookiness}/5\n\
         \n\
         Generate recommendations that include a mix of:\n\
         - Ghost entities matching their interests\n\
         - Stories from their preferred cultures\n\
         - Movies and myths appropriate to their spookiness level\n\
         \n\
         For each recommendation, provide:\n\
         1. content_id (generate a plausible ID like \"ghost_001\" or \"story_japanese_001\")\n\
         2. content_type (ghost_entity, story, movie, or myth)\n\
         3. score (0.0-1.0)\n\
         4. reasoning (brief explanation why this matches their preferences)\n\
         \n\
         Return ONLY a valid JSON array with no additional text.",
        limit = limit,
        favorite_types = join_or(&profile.favorite_ghost_types, "None specified"),
        preferred_content = join_or(&profile.preferred_content_types, "All types"),
        cultural_interests = join_or(&profile.cultural_interests, "General"),
        spookiness = profile.spookiness_level,
    )
}

fn personalized_prompt(
    profile: &PreferenceProfile,
    history: &[InteractionRecord],
    limit: usize,
) -> String {
    let skip = history.len().saturating_sub(HISTORY_WINDOW);
    let recent_content: Vec<String> = history[skip..]
        .iter()
        .map(|i| {
            format!(
                "{}: {} ({})",
                i.content_type, i.content_id, i.interaction_type
            )
        })
        .collect();

    format!(
        "You are a paranormal content recommendation expert. Generate {limit} personalized recommendations based on:\n\
         \n\
         User Preferences:\n\
         - Favorite Ghost Types: {favorite_types}\n\
         - Preferred Content: {preferred_content}\n\
         - Spookiness Level: {spookiness}/5\n\
         \n\
         Recent Activity:\n\
         {recent_content}\n\
         \n\
         Generate diverse recommendations that:\n\
         1. Build on their recent interests\n\
         2. Introduce new but related content\n\
         3. Match their spookiness comfort level\n\
         4. Include multiple content types (ghost_entity, story, movie, myth)\n\
         \n\
         For each recommendation, provide:\n\
         1. content_id (generate a plausible ID)\n\
         2. content_type (ghost_entity, story, movie, or myth)\n\
         3. score (0.0-1.0)\n\
         4. reasoning (brief explanation)\n\
         \n\
         Return ONLY a valid JSON array with no additional text.",
        limit = limit,
        favorite_types = join_or(&profile.favorite_ghost_types, "Various"),
        preferred_content = join_or(&profile.preferred_content_types, "All types"),
        spookiness = profile.spookiness_level,
        recent_content = recent_content.join("\n"),
    )
}

/// Deterministic placeholder recommendations for when generation is unusable
///
/// Cycles through the four content types and the user's favorite ghost types
/// (default "ghost"), with scores decreasing from 0.7 by 0.05 per rank.
/// Always yields exactly `limit` items; this path cannot fail.
fn fallback_recommendations(profile: &PreferenceProfile, limit: usize) -> Vec<Recommendation> {
    let default_types = vec!["ghost".to_string()];
    let ghost_types = if profile.favorite_ghost_types.is_empty() {
        &default_types
    } else {
        &profile.favorite_ghost_types
    };

    (0..limit)
        .map(|i| {
            let content_type = ContentType::ALL[i % ContentType::ALL.len()];
            let ghost_type = &ghost_types[i % ghost_types.len()];

            Recommendation {
                content_id: format!("{}_{}_{}", content_type, ghost_type, i),
                content_type,
                score: FALLBACK_TOP_SCORE - (i as f64) * FALLBACK_SCORE_STEP,
                reasoning: format!("Popular {} related to {}", content_type, ghost_type),
            }
        })
        .collect()
}

/// Caps the dominance of any single content type
///
/// Lists already spanning three or more types pass through unchanged.
/// Otherwise each type group is capped at `max(3, total / num_types)` items
/// (integer division), keeping in-group order, with groups concatenated in
/// the order their type first appeared. This can shrink the list.
fn ensure_diversity(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    if recommendations.is_empty() {
        return recommendations;
    }

    let mut type_order: Vec<ContentType> = Vec::new();
    for rec in &recommendations {
        if !type_order.contains(&rec.content_type) {
            type_order.push(rec.content_type);
        }
    }

    if type_order.len() >= DIVERSITY_TARGET {
        return recommendations;
    }

    let max_per_type = std::cmp::max(3, recommendations.len() / type_order.len());

    let mut by_type: HashMap<ContentType, Vec<Recommendation>> = HashMap::new();
    for rec in recommendations {
        by_type.entry(rec.content_type).or_default().push(rec);
    }

    let mut balanced = Vec::new();
    for content_type in type_order {
        if let Some(group) = by_type.remove(&content_type) {
            balanced.extend(group.into_iter().take(max_per_type));
        }
    }

    balanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::providers::MockTextGenerator;

    const GENERATED_ARRAY: &str = r#"[
        {"content_id": "ghost_yurei_01", "content_type": "ghost_entity", "score": 0.95, "reasoning": "Matches yurei interest"},
        {"content_id": "story_japanese_01", "content_type": "story", "score": 0.9, "reasoning": "Cultural fit"},
        {"content_id": "movie_ring_01", "content_type": "movie", "score": 0.85, "reasoning": "Spookiness match"},
        {"content_id": "myth_kappa_01", "content_type": "myth", "score": 0.8, "reasoning": "Related folklore"}
    ]"#;

    fn profile_with(types: &[&str]) -> PreferenceProfile {
        PreferenceProfile {
            favorite_ghost_types: types.iter().map(|t| t.to_string()).collect(),
            ..PreferenceProfile::default()
        }
    }

    fn interaction(content_type: &str, content_id: &str, interaction_type: &str) -> InteractionRecord {
        InteractionRecord {
            content_id: content_id.to_string(),
            content_type: content_type.to_string(),
            interaction_type: interaction_type.to_string(),
            timestamp: String::new(),
        }
    }

    fn rec(id: &str, content_type: ContentType) -> Recommendation {
        Recommendation {
            content_id: id.to_string(),
            content_type,
            score: 0.5,
            reasoning: "test".to_string(),
        }
    }

    fn engine_with(mock: MockTextGenerator) -> RecommendationEngine {
        RecommendationEngine::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_generated_recommendations_are_parsed_and_returned() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        let recs = engine
            .generate_recommendations("u1", &profile_with(&["yurei"]), &[], 10)
            .await;

        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].content_id, "ghost_yurei_01");
        assert_eq!(recs[3].content_type, ContentType::Myth);
    }

    #[tokio::test]
    async fn test_generated_list_is_truncated_to_limit() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        let recs = engine
            .generate_recommendations("u1", &PreferenceProfile::default(), &[], 2)
            .await;

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].content_id, "ghost_yurei_01");
    }

    #[tokio::test]
    async fn test_fallback_when_generation_fails() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Err(AppError::ExternalApi("rate limited".to_string())));

        let engine = engine_with(mock);
        let recs = engine
            .generate_recommendations("u1", &PreferenceProfile::default(), &[], 10)
            .await;

        assert_eq!(recs.len(), 10);
        for (i, rec) in recs.iter().enumerate() {
            assert_eq!(rec.content_type, ContentType::ALL[i % 4]);
            let expected_score = FALLBACK_TOP_SCORE - (i as f64) * FALLBACK_SCORE_STEP;
            assert!((rec.score - expected_score).abs() < 1e-9);
        }
        assert_eq!(recs[0].content_id, "ghost_entity_ghost_0");
        assert_eq!(recs[0].reasoning, "Popular ghost_entity related to ghost");
    }

    #[tokio::test]
    async fn test_fallback_cycles_favorite_ghost_types() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_, _| Ok("not json at all".to_string()));

        let engine = engine_with(mock);
        let recs = engine
            .generate_recommendations("u1", &profile_with(&["yurei", "poltergeist"]), &[], 4)
            .await;

        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].content_id, "ghost_entity_yurei_0");
        assert_eq!(recs[1].content_id, "story_poltergeist_1");
        assert_eq!(recs[2].content_id, "movie_yurei_2");
        assert_eq!(recs[3].content_id, "myth_poltergeist_3");
    }

    #[tokio::test]
    async fn test_cold_start_prompt_used_for_empty_history() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|prompt, _| prompt.contains("new user") && !prompt.contains("Recent Activity"))
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        engine
            .generate_recommendations("u1", &profile_with(&["yurei"]), &[], 10)
            .await;
    }

    #[tokio::test]
    async fn test_personalized_prompt_summarizes_last_ten_interactions() {
        let history: Vec<InteractionRecord> = (0..12)
            .map(|i| interaction("story", &format!("story_{:02}", i), "view"))
            .collect();

        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|prompt, _| {
                prompt.contains("Recent Activity:")
                    && prompt.contains("story: story_11 (view)")
                    && prompt.contains("story: story_02 (view)")
                    && !prompt.contains("story_01")
                    && !prompt.contains("story_00")
            })
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        engine
            .generate_recommendations("u1", &profile_with(&["yurei"]), &history, 10)
            .await;
    }

    #[tokio::test]
    async fn test_cache_hit_skips_second_generation_call() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        let profile_a = profile_with(&["yurei"]);
        let profile_b = profile_with(&["yurei"]);

        let first = engine
            .generate_recommendations("u1", &profile_a, &[], 10)
            .await;
        let second = engine
            .generate_recommendations("u1", &profile_b, &[], 10)
            .await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_cache_for_one_user_only() {
        let mut mock = MockTextGenerator::new();
        // u1 twice (before and after invalidation) plus u2 once
        mock.expect_generate()
            .times(3)
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        let profile = PreferenceProfile::default();

        engine.generate_recommendations("u1", &profile, &[], 10).await;
        engine.generate_recommendations("u2", &profile, &[], 10).await;

        engine.invalidate_cache(Some("u1")).await;

        // u1 regenerates, u2 still comes from cache
        engine.generate_recommendations("u1", &profile, &[], 10).await;
        engine.generate_recommendations("u2", &profile, &[], 10).await;
    }

    #[tokio::test]
    async fn test_invalidate_cache_without_user_clears_all() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(2)
            .returning(|_, _| Ok(GENERATED_ARRAY.to_string()));

        let engine = engine_with(mock);
        let profile = PreferenceProfile::default();

        engine.generate_recommendations("u1", &profile, &[], 10).await;
        engine.invalidate_cache(None).await;
        engine.generate_recommendations("u1", &profile, &[], 10).await;
    }

    #[test]
    fn test_diversity_passes_three_or_more_types_unchanged() {
        let recs = vec![
            rec("a", ContentType::GhostEntity),
            rec("b", ContentType::Story),
            rec("c", ContentType::GhostEntity),
            rec("d", ContentType::Myth),
        ];

        let balanced = ensure_diversity(recs.clone());
        assert_eq!(balanced, recs);
    }

    #[test]
    fn test_diversity_caps_dominant_type() {
        let mut recs: Vec<Recommendation> = (0..8)
            .map(|i| rec(&format!("g{}", i), ContentType::GhostEntity))
            .collect();
        recs.push(rec("s0", ContentType::Story));
        recs.push(rec("s1", ContentType::Story));

        let balanced = ensure_diversity(recs);

        // 10 items over 2 types: cap is max(3, 10 / 2) = 5 per type
        let ghost_count = balanced
            .iter()
            .filter(|r| r.content_type == ContentType::GhostEntity)
            .count();
        assert_eq!(ghost_count, 5);
        assert_eq!(balanced.len(), 7);

        // Group order follows first encounter, in-group order preserved
        assert_eq!(balanced[0].content_id, "g0");
        assert_eq!(balanced[4].content_id, "g4");
        assert_eq!(balanced[5].content_id, "s0");
        assert_eq!(balanced[6].content_id, "s1");
    }

    #[test]
    fn test_diversity_keeps_minimum_of_three_per_type() {
        let recs = vec![
            rec("g0", ContentType::GhostEntity),
            rec("g1", ContentType::GhostEntity),
            rec("g2", ContentType::GhostEntity),
            rec("s0", ContentType::Story),
        ];

        // 4 items over 2 types gives 4 / 2 = 2, but the floor of 3 wins
        let balanced = ensure_diversity(recs.clone());
        assert_eq!(balanced, recs);
    }

    #[test]
    fn test_diversity_on_empty_list_is_noop() {
        assert!(ensure_diversity(Vec::new()).is_empty());
    }
}
