pub mod dry_stress;
pub mod engine;
pub mod leak;
pub mod nutrient;
pub mod over_irrigation;
pub mod sensor_dropout;

pub use engine::AnomalyDetector;

use super::calculations::timeline;
use crate::config::AnomalyConfig;
use crate::models::{Alert, CropProfile, RecommendationRecord, TelemetrySample};

/// Everything an anomaly rule may look at for one field.
pub struct AnomalyContext<'a> {
    /// Chronological window ending with `latest`.
    pub timeline: Vec<&'a TelemetrySample>,
    pub latest: &'a TelemetrySample,
    pub profile: &'a CropProfile,
    /// Recommendations previously issued for this field.
    pub issued: &'a [RecommendationRecord],
}

impl<'a> AnomalyContext<'a> {
    pub fn new(
        history: &'a [TelemetrySample],
        latest: &'a TelemetrySample,
        profile: &'a CropProfile,
        issued: &'a [RecommendationRecord],
    ) -> Self {
        Self {
            timeline: timeline(history, latest),
            latest,
            profile,
            issued,
        }
    }
}

/// Trait for anomaly rules
pub trait AnomalyRule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Evaluate the rule and return every alert it raises
    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert>;
}
