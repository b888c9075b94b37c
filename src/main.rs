use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ghostypedia_ai::api::{create_router, AppState};
use ghostypedia_ai::config::Config;
use ghostypedia_ai::services::providers::GeminiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing GEMINI_API_KEY is a fatal startup condition
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let generator = Arc::new(GeminiProvider::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    ));

    let state = AppState::new(generator);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, model = %config.gemini_model, "AI service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
