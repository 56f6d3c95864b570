use super::dry_stress::band_severity;
use super::{AnomalyContext, AnomalyRule};
use crate::config::AnomalyConfig;
use crate::logic::calculations::{confidence, trailing_run};
use crate::models::{Alert, AlertKind};

/// Over-irrigation rule - soil held above the ideal band for several readings
///
/// Mirror of the dry stress rule against `max + stress_margin`. Prolonged
/// saturation starves roots of oxygen and leaches nitrogen.
pub struct OverIrrigationRule;

impl AnomalyRule for OverIrrigationRule {
    fn id(&self) -> &'static str {
        "over_irrigation"
    }

    fn name(&self) -> &'static str {
        "Sustained Over-Irrigation"
    }

    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert> {
        let Some(moisture) = ctx.latest.soil.moisture else {
            return Vec::new();
        };

        let band = ctx.profile.ideal_moisture_range;
        let threshold = band.max + config.stress_margin;
        let run = trailing_run(&ctx.timeline, |s| {
            s.soil.moisture.is_some_and(|m| m > threshold)
        });

        if run < config.sustain_samples {
            return Vec::new();
        }

        let height = moisture - threshold;
        let mut severity = band_severity(height);
        if run >= config.sustain_samples * 2 {
            severity = severity.escalate();
        }

        vec![Alert::detected(
            AlertKind::OverIrrigation,
            severity,
            confidence(height, config.confidence_slope),
            format!(
                "Soil moisture {:.1}% has stayed above {:.1}% for {} consecutive readings \
                 (ideal {}%); check for overwatering or poor drainage",
                moisture, threshold, run, band
            ),
            ctx.latest.timestamp,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CropProfile, Priority, TelemetrySample};
    use chrono::{Duration, TimeZone, Utc};

    fn run(values: &[f64]) -> Vec<Alert> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let all: Vec<TelemetrySample> = values
            .iter()
            .enumerate()
            .map(|(i, m)| {
                TelemetrySample::new(base + Duration::minutes(i as i64 * 10), "Wheat")
                    .with_moisture(*m)
            })
            .collect();
        let (latest, history) = all.split_last().unwrap();
        let profile = CropProfile::new("Wheat", 30.0, 60.0);
        let ctx = AnomalyContext::new(history, latest, &profile, &[]);
        OverIrrigationRule.evaluate(&ctx, &AnomalyConfig::default())
    }

    #[test]
    fn sustained_saturation_alerts() {
        let alerts = run(&[50.0, 70.0, 72.0, 74.0]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::OverIrrigation);
        // threshold 65, height 9
        assert_eq!(alerts[0].severity, Priority::High);
        assert_eq!(alerts[0].confidence, 77);
    }

    #[test]
    fn short_or_marginal_runs_are_ignored() {
        assert!(run(&[50.0, 50.0, 90.0]).is_empty());
        assert!(run(&[63.0, 63.0, 63.0, 63.0]).is_empty());
    }
}
