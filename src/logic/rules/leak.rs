use super::{AnomalyContext, AnomalyRule};
use crate::config::AnomalyConfig;
use crate::logic::calculations::confidence;
use crate::models::{Alert, AlertKind, Priority, RecommendationRecord, TelemetrySample};
use chrono::Duration;

/// Leak rule - sudden moisture rise that no irrigation explains
///
/// Conditions:
/// - Rise greater than `leak_jump` between consecutive readings
/// - No Irrigate recommendation for the crop issued between
///   `leak_grace_minutes` before the earlier reading and the later reading
///
/// Severity levels:
/// - Medium: rise under twice the jump threshold
/// - High: rise of twice the threshold or more
/// - escalated one level when the rise ends above the ideal band
pub struct LeakRule;

impl AnomalyRule for LeakRule {
    fn id(&self) -> &'static str {
        "leak_suspected"
    }

    fn name(&self) -> &'static str {
        "Suspected Leak"
    }

    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert> {
        let grace = Duration::minutes(config.leak_grace_minutes.max(0));
        let band = ctx.profile.ideal_moisture_range;

        ctx.timeline
            .windows(2)
            .filter_map(|pair| {
                let (prev, cur) = (pair[0], pair[1]);
                let before = prev.soil.moisture?;
                let after = cur.soil.moisture?;
                let rise = after - before;

                if rise <= config.leak_jump || irrigation_explains(ctx.issued, prev, cur, grace) {
                    return None;
                }

                let mut severity = if rise >= config.leak_jump * 2.0 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                if after > band.max {
                    severity = severity.escalate();
                }

                Some(Alert::detected(
                    AlertKind::LeakSuspected,
                    severity,
                    confidence(rise - config.leak_jump, config.confidence_slope),
                    format!(
                        "Soil moisture jumped {:.1}% -> {:.1}% (+{:.1}pp) between {} and {} \
                         with no irrigation recommended; inspect lines and valves",
                        before,
                        after,
                        rise,
                        prev.timestamp.format("%Y-%m-%d %H:%M"),
                        cur.timestamp.format("%H:%M")
                    ),
                    cur.timestamp,
                ))
            })
            .collect()
    }
}

fn irrigation_explains(
    issued: &[RecommendationRecord],
    prev: &TelemetrySample,
    cur: &TelemetrySample,
    grace: Duration,
) -> bool {
    let from = prev.timestamp - grace;
    issued.iter().any(|record| {
        record.recommendation.is_irrigate()
            && record.crop_type == cur.crop_type
            && record.timestamp >= from
            && record.timestamp <= cur.timestamp
    })
}
