use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::{TwinContext, TwinReply};
use crate::services::context::assemble_context;
use crate::services::extraction::extract_content_references;
use crate::services::providers::{GenerationOptions, TextGenerator};

/// Token cap keeping replies short enough for conversational latency
const REPLY_MAX_OUTPUT_TOKENS: u32 = 500;
const REPLY_TEMPERATURE: f32 = 0.7;

/// Advisory latency threshold. Elapsed time is measured after the generation
/// call returns; the call itself is never cancelled, so a slow upstream still
/// burns its full latency before the reply is declared too slow.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

const TIMEOUT_APOLOGY: &str =
    "I'm taking a bit longer to think about that. Could you rephrase your question?";
const FAILURE_APOLOGY: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Conversational "digital twin" persona backed by the generation provider
///
/// Assembles a bounded context block from the caller-supplied preferences and
/// history, wraps it in a fixed persona prompt, and extracts inline content
/// tags from the reply. Degrades gracefully: generation failures and
/// over-threshold replies come back as `success = false` replies carrying an
/// apology, never as errors.
pub struct DigitalTwinService {
    generator: Arc<dyn TextGenerator>,
    response_timeout: Duration,
}

impl DigitalTwinService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(generator: Arc<dyn TextGenerator>, response_timeout: Duration) -> Self {
        Self {
            generator,
            response_timeout,
        }
    }

    /// Produces one persona reply for a user message. Never fails.
    pub async fn generate_response(
        &self,
        user_id: &str,
        message: &str,
        context: &TwinContext,
    ) -> TwinReply {
        let started = Instant::now();

        let system_context = assemble_context(context);
        let prompt = persona_prompt(message, &system_context);

        let options = GenerationOptions {
            max_output_tokens: Some(REPLY_MAX_OUTPUT_TOKENS),
            temperature: Some(REPLY_TEMPERATURE),
        };

        match self.generator.generate(&prompt, &options).await {
            Ok(text) => {
                let elapsed = started.elapsed();
                if elapsed > self.response_timeout {
                    tracing::warn!(
                        user_id = %user_id,
                        elapsed_secs = elapsed.as_secs_f64(),
                        "Twin reply exceeded the response threshold, discarding"
                    );
                    return TwinReply {
                        response: TIMEOUT_APOLOGY.to_string(),
                        content_references: Vec::new(),
                        response_time: elapsed.as_secs_f64(),
                        success: false,
                        error: Some("timeout".to_string()),
                    };
                }

                let content_references = extract_content_references(&text);
                tracing::info!(
                    user_id = %user_id,
                    references = content_references.len(),
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Twin reply generated"
                );

                TwinReply {
                    response: text,
                    content_references,
                    response_time: elapsed.as_secs_f64(),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                let elapsed = started.elapsed();
                tracing::warn!(user_id = %user_id, error = %e, "Twin generation failed, degrading");
                TwinReply {
                    response: FAILURE_APOLOGY.to_string(),
                    content_references: Vec::new(),
                    response_time: elapsed.as_secs_f64(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn persona_prompt(user_message: &str, system_context: &str) -> String {
    format!(
        "You are a knowledgeable and friendly digital twin guide for Ghostypedia, an encyclopedia of ghosts, creatures, myths, and paranormal entities. Your role is to:\n\
         \n\
         1. Help users discover fascinating paranormal content\n\
         2. Answer questions about ghosts, myths, and supernatural beings\n\
         3. Provide personalized recommendations based on their interests\n\
         4. Share interesting stories and folklore\n\
         5. Be engaging, slightly mysterious, but always helpful\n\
         \n\
         When referencing specific content, use this format:\n\
         - For ghost entities: [GHOST:entity_id]\n\
         - For stories: [STORY:story_id]\n\
         - For movies: [MOVIE:movie_id]\n\
         - For myths: [MYTH:myth_id]\n\
         \n\
         {system_context}\n\
         \n\
         User Message: {user_message}\n\
         \n\
         Respond in a conversational, engaging way. Keep responses concise (2-3 paragraphs max). If you reference specific content, include the appropriate tags."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::{ContentReference, PreferenceProfile};

    struct FixedGenerator(&'static str);

    #[async_trait::async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> AppResult<String> {
            Err(AppError::ExternalApi("upstream unavailable".to_string()))
        }
    }

    struct SlowGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> AppResult<String> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok("Too slow to matter [GHOST:oiwa]".to_string())
        }
    }

    #[tokio::test]
    async fn test_successful_reply_extracts_references() {
        let twin = DigitalTwinService::new(Arc::new(FixedGenerator(
            "You would enjoy [GHOST:oiwa] and [STORY:banshee_tale].",
        )));

        let reply = twin
            .generate_response("u1", "What should I read?", &TwinContext::default())
            .await;

        assert!(reply.success);
        assert!(reply.error.is_none());
        assert_eq!(
            reply.content_references,
            vec![
                ContentReference {
                    content_type: "ghost_entity".to_string(),
                    content_id: "oiwa".to_string(),
                },
                ContentReference {
                    content_type: "story".to_string(),
                    content_id: "banshee_tale".to_string(),
                },
            ]
        );
        assert!(reply.response_time >= 0.0);
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_to_apology() {
        let twin = DigitalTwinService::new(Arc::new(FailingGenerator));

        let reply = twin
            .generate_response("u1", "Hello?", &TwinContext::default())
            .await;

        assert!(!reply.success);
        assert_eq!(reply.response, FAILURE_APOLOGY);
        assert!(reply.content_references.is_empty());
        assert!(reply.error.unwrap().contains("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_slow_reply_is_discarded_as_timeout() {
        let twin = DigitalTwinService::with_timeout(
            Arc::new(SlowGenerator),
            Duration::from_millis(5),
        );

        let reply = twin
            .generate_response("u1", "Tell me everything", &TwinContext::default())
            .await;

        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("timeout"));
        assert_eq!(reply.response, TIMEOUT_APOLOGY);
        assert!(reply.content_references.is_empty());
        assert!(reply.response_time > 0.005);
    }

    #[tokio::test]
    async fn test_prompt_embeds_context_and_message() {
        // Capture the prompt through a generator that asserts on it
        struct AssertingGenerator;

        #[async_trait::async_trait]
        impl TextGenerator for AssertingGenerator {
            async fn generate(
                &self,
                prompt: &str,
                options: &GenerationOptions,
            ) -> AppResult<String> {
                assert!(prompt.contains("digital twin guide for Ghostypedia"));
                assert!(prompt.contains("- Comfort with spookiness: 4/5"));
                assert!(prompt.contains("User Message: Any yurei stories?"));
                assert_eq!(options.max_output_tokens, Some(500));
                assert_eq!(options.temperature, Some(0.7));
                Ok("Plenty. [STORY:yotsuya_kaidan]".to_string())
            }
        }

        let twin = DigitalTwinService::new(Arc::new(AssertingGenerator));
        let context = TwinContext {
            user_preferences: Some(PreferenceProfile {
                spookiness_level: 4,
                ..PreferenceProfile::default()
            }),
            ..TwinContext::default()
        };

        let reply = twin
            .generate_response("u1", "Any yurei stories?", &context)
            .await;
        assert!(reply.success);
    }
}
