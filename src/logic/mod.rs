pub mod analytics;
pub mod calculations;
pub mod engine;
pub mod recommendation;
pub mod rules;
pub mod status;
pub mod water_savings;
pub mod weather;
pub mod yield_health;

pub use engine::{Assessment, FieldSnapshot, IntelligenceEngine};
pub use recommendation::RecommendationEngine;
pub use rules::AnomalyDetector;
pub use status::StatusService;
pub use water_savings::WaterSavingsEstimator;
pub use weather::WeatherEnricher;
pub use yield_health::YieldHealthScorer;
