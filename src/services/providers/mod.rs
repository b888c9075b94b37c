/// Text-generation provider abstraction
///
/// The engine and the digital twin only ever see this seam. Any failure
/// behind it is recoverable by the callers: the engine falls back to
/// deterministic placeholders, the twin degrades to an apology reply.
use crate::error::AppResult;

pub mod gemini;

pub use gemini::GeminiProvider;

/// Knobs forwarded to the generation endpoint
///
/// Unset fields leave the model's own defaults in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Trait for text-generation providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Completes a prompt into raw text
    ///
    /// May fail for any upstream reason (rate limit, network, malformed
    /// prompt) and may return malformed content; callers must treat both as
    /// recoverable.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> AppResult<String>;
}
