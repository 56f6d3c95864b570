use super::{AnomalyContext, AnomalyRule};
use crate::config::AnomalyConfig;
use crate::logic::calculations::confidence;
use crate::models::{Alert, AlertKind, Nutrient, Priority};

/// Nutrient deficiency rule - N, P or K reading below the crop's target band
///
/// Severity levels by shortfall relative to the band minimum:
/// - Low: up to 25%
/// - Medium: 25-50%
/// - High: more than 50%
///
/// Nutrients without a target band or without a reading are skipped.
pub struct NutrientDeficiencyRule;

impl AnomalyRule for NutrientDeficiencyRule {
    fn id(&self) -> &'static str {
        "nutrient_deficiency"
    }

    fn name(&self) -> &'static str {
        "Nutrient Deficiency"
    }

    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert> {
        let latest = ctx.latest;

        Nutrient::ALL
            .iter()
            .filter_map(|&nutrient| {
                let band = ctx.profile.nutrient_band(nutrient)?;
                let value = latest.soil.nutrient(nutrient).filter(|v| v.is_finite())?;
                if value >= band.min || band.min <= 0.0 {
                    return None;
                }

                let shortfall_pct = (band.min - value) / band.min * 100.0;
                let severity = if shortfall_pct > 50.0 {
                    Priority::High
                } else if shortfall_pct > 25.0 {
                    Priority::Medium
                } else {
                    Priority::Low
                };

                let mut message = format!(
                    "{} at {:.1} mg/kg is {:.0}% below the target {} mg/kg",
                    nutrient, value, shortfall_pct, band
                );
                if !latest.fertilizer_name.is_empty() {
                    message.push_str(&format!(
                        "; last fertilizer applied: {}",
                        latest.fertilizer_name
                    ));
                }

                Some(
                    Alert::detected(
                        AlertKind::NutrientDeficiency,
                        severity,
                        confidence(shortfall_pct, config.confidence_slope),
                        message,
                        latest.timestamp,
                    )
                    .with_subject(nutrient.as_str()),
                )
            })
            .collect()
    }
}
