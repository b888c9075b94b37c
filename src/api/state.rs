use std::sync::Arc;

use crate::services::providers::TextGenerator;
use crate::services::{DigitalTwinService, RecommendationEngine};

/// Shared application state
///
/// One engine and one twin service per process, both backed by the same
/// configured generation provider. The recommendation cache lives inside the
/// engine and is shared across requests.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub twin: Arc<DigitalTwinService>,
}

impl AppState {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            engine: Arc::new(RecommendationEngine::new(generator.clone())),
            twin: Arc::new(DigitalTwinService::new(generator)),
        }
    }
}
