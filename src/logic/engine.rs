use super::recommendation::RecommendationEngine;
use super::rules::AnomalyDetector;
use super::water_savings::WaterSavingsEstimator;
use super::yield_health::YieldHealthScorer;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{
    Alert, CropProfile, Recommendation, RecommendationRecord, TelemetrySample, WaterSavings,
    YieldHealth,
};
use serde::Serialize;

/// Everything the engine needs to assess one field. Borrowed from the caller;
/// the engine never keeps it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSnapshot<'a> {
    /// Already weather-enriched.
    pub latest: &'a TelemetrySample,
    /// Prior samples, any order.
    pub history: &'a [TelemetrySample],
    /// `None` when no profile is stored for the crop.
    pub profile: Option<&'a CropProfile>,
    /// Recommendation log for the field.
    pub issued: &'a [RecommendationRecord],
}

impl<'a> FieldSnapshot<'a> {
    pub fn new(latest: &'a TelemetrySample) -> Self {
        Self {
            latest,
            history: &[],
            profile: None,
            issued: &[],
        }
    }

    pub fn with_history(mut self, history: &'a [TelemetrySample]) -> Self {
        self.history = history;
        self
    }

    pub fn with_profile(mut self, profile: Option<&'a CropProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_issued(mut self, issued: &'a [RecommendationRecord]) -> Self {
        self.issued = issued;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub recommendation: Recommendation,
    pub alerts: Vec<Alert>,
    pub water_savings: WaterSavings,
    pub yield_health: YieldHealth,
    /// Profile actually applied, the default one when none was stored.
    pub profile: CropProfile,
}

/// Facade over the four pure components.
///
/// Holds configuration only, so one instance can serve any number of fields
/// concurrently.
pub struct IntelligenceEngine {
    default_profile: CropProfile,
    recommender: RecommendationEngine,
    detector: AnomalyDetector,
    savings: WaterSavingsEstimator,
    scorer: YieldHealthScorer,
}

impl IntelligenceEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            default_profile: config.default_profile,
            recommender: RecommendationEngine::new(config.recommendation),
            detector: AnomalyDetector::new(config.anomaly),
            savings: WaterSavingsEstimator::new(config.water_savings),
            scorer: YieldHealthScorer::new(config.yield_health),
        })
    }

    pub fn default_profile(&self) -> &CropProfile {
        &self.default_profile
    }

    pub fn resolve_profile<'a>(&'a self, profile: Option<&'a CropProfile>) -> &'a CropProfile {
        profile.unwrap_or(&self.default_profile)
    }

    /// Runs every component over the snapshot. Fails only on invalid input.
    pub fn assess(&self, snapshot: FieldSnapshot<'_>) -> Result<Assessment> {
        let FieldSnapshot {
            latest,
            history,
            profile,
            issued,
        } = snapshot;

        let profile = self.resolve_profile(profile);
        let recommendation = self.recommender.recommend(latest, profile, history)?;
        let yield_health = self.scorer.score(latest, profile)?;
        let alerts = self.detector.detect(history, latest, profile, issued);
        let water_savings = self.savings.estimate(history, latest, issued, &recommendation);

        tracing::debug!(
            crop_type = %latest.crop_type,
            profile = %profile.name,
            action = %recommendation.action,
            alerts = alerts.len(),
            yield_health = yield_health.value(),
            "Field assessed"
        );

        Ok(Assessment {
            recommendation,
            alerts,
            water_savings,
            yield_health,
            profile: profile.clone(),
        })
    }
}
