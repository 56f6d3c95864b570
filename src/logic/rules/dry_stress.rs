use super::{AnomalyContext, AnomalyRule};
use crate::config::AnomalyConfig;
use crate::logic::calculations::{confidence, trailing_run};
use crate::models::{Alert, AlertKind, Priority};

/// Dry stress rule - soil held below the ideal band for several readings
///
/// Conditions:
/// - Latest `sustain_samples` readings all below `min - stress_margin`
///
/// Severity levels:
/// - Medium: up to 8pp below the threshold
/// - High: 8-15pp below
/// - Critical: more than 15pp below
///
/// A run twice the required length escalates one level.
pub struct DryStressRule;

impl AnomalyRule for DryStressRule {
    fn id(&self) -> &'static str {
        "dry_stress"
    }

    fn name(&self) -> &'static str {
        "Sustained Dry Stress"
    }

    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert> {
        let Some(moisture) = ctx.latest.soil.moisture else {
            return Vec::new();
        };

        let band = ctx.profile.ideal_moisture_range;
        let threshold = band.min - config.stress_margin;
        let run = trailing_run(&ctx.timeline, |s| {
            s.soil.moisture.is_some_and(|m| m < threshold)
        });

        if run < config.sustain_samples {
            return Vec::new();
        }

        let depth = threshold - moisture;
        let mut severity = band_severity(depth);
        if run >= config.sustain_samples * 2 {
            severity = severity.escalate();
        }

        vec![Alert::detected(
            AlertKind::DryStress,
            severity,
            confidence(depth, config.confidence_slope),
            format!(
                "Soil moisture {:.1}% has stayed below {:.1}% for {} consecutive readings \
                 (ideal {}%); crop is under water stress",
                moisture, threshold, run, band
            ),
            ctx.latest.timestamp,
        )]
    }
}

/// Shared with the over-irrigation rule.
pub(super) fn band_severity(distance: f64) -> Priority {
    if distance > 15.0 {
        Priority::Critical
    } else if distance > 8.0 {
        Priority::High
    } else {
        Priority::Medium
    }
}
