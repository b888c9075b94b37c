pub mod context;
pub mod digital_twin;
pub mod extraction;
pub mod parsing;
pub mod providers;
pub mod recommendations;

pub use digital_twin::DigitalTwinService;
pub use recommendations::RecommendationEngine;
