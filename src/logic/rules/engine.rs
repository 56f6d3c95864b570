use super::{
    dry_stress::DryStressRule, leak::LeakRule, nutrient::NutrientDeficiencyRule,
    over_irrigation::OverIrrigationRule, sensor_dropout::SensorDropoutRule, AnomalyContext,
    AnomalyRule,
};
use crate::config::AnomalyConfig;
use crate::models::{Alert, CropProfile, RecommendationRecord, TelemetrySample};

pub struct AnomalyDetector {
    rules: Vec<Box<dyn AnomalyRule>>,
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        let rules: Vec<Box<dyn AnomalyRule>> = vec![
            Box::new(DryStressRule),
            Box::new(OverIrrigationRule),
            Box::new(LeakRule),
            Box::new(SensorDropoutRule),
            Box::new(NutrientDeficiencyRule),
        ];

        Self { rules, config }
    }

    /// Runs every rule over the window. Alerts come back most severe first;
    /// identical input always yields identical output.
    pub fn detect(
        &self,
        history: &[TelemetrySample],
        latest: &TelemetrySample,
        profile: &CropProfile,
        issued: &[RecommendationRecord],
    ) -> Vec<Alert> {
        let ctx = AnomalyContext::new(history, latest, profile, issued);

        let mut alerts: Vec<Alert> = self
            .rules
            .iter()
            .flat_map(|rule| {
                let raised = rule.evaluate(&ctx, &self.config);
                if !raised.is_empty() {
                    tracing::debug!(rule = rule.id(), count = raised.len(), "Anomaly rule fired");
                }
                raised
            })
            .collect();

        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
                .then_with(|| a.id.cmp(&b.id))
        });
        alerts
    }

    pub fn evaluate_rule(
        &self,
        rule_id: &str,
        history: &[TelemetrySample],
        latest: &TelemetrySample,
        profile: &CropProfile,
        issued: &[RecommendationRecord],
    ) -> Vec<Alert> {
        let ctx = AnomalyContext::new(history, latest, profile, issued);
        self.rules
            .iter()
            .find(|r| r.id() == rule_id)
            .map(|rule| rule.evaluate(&ctx, &self.config))
            .unwrap_or_default()
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str)> {
        self.rules.iter().map(|r| (r.id(), r.name())).collect()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default())
    }
}
