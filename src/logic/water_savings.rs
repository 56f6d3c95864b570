use super::calculations::{round1, round2, timeline};
use crate::config::WaterSavingsConfig;
use crate::models::{Recommendation, RecommendationRecord, TelemetrySample, WaterSavings};

/// Compares demand-driven irrigation against a calendar schedule that
/// applies a constant dose every sampling interval.
pub struct WaterSavingsEstimator {
    config: WaterSavingsConfig,
}

impl WaterSavingsEstimator {
    pub fn new(config: WaterSavingsConfig) -> Self {
        Self { config }
    }

    /// `issued` is the recommendation log for the field; only Irrigate
    /// entries for the latest sample's crop inside the window count.
    pub fn estimate(
        &self,
        history: &[TelemetrySample],
        latest: &TelemetrySample,
        issued: &[RecommendationRecord],
        current: &Recommendation,
    ) -> WaterSavings {
        let window = timeline(history, latest);
        let intervals = window.len().saturating_sub(1);
        let dose = self.config.fixed_dose_per_interval.max(0.0);
        let fixed_total = dose * intervals as f64;

        let start = window.first().map(|s| s.timestamp).unwrap_or(latest.timestamp);
        let logged: f64 = issued
            .iter()
            .filter(|r| {
                r.crop_type == latest.crop_type
                    && r.timestamp >= start
                    && r.timestamp < latest.timestamp
            })
            .map(|r| r.recommendation.applied_amount())
            .sum();
        let actual_total = logged + current.applied_amount();

        let saved = (fixed_total - actual_total).max(0.0);
        let percentage = if fixed_total > 0.0 {
            (saved / fixed_total * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        tracing::debug!(
            intervals,
            fixed_total,
            actual_total,
            "Estimated water savings"
        );

        WaterSavings {
            saved: round2(saved),
            percentage: round1(percentage),
            fixed_total: round2(fixed_total),
            actual_total: round2(actual_total),
        }
    }
}

impl Default for WaterSavingsEstimator {
    fn default() -> Self {
        Self::new(WaterSavingsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, IrrigationPlan, Priority};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn samples(count: i64) -> (Vec<TelemetrySample>, TelemetrySample) {
        let mut all: Vec<TelemetrySample> = (0..count)
            .map(|h| TelemetrySample::new(at(h), "Wheat").with_moisture(40.0))
            .collect();
        let latest = all.pop().unwrap();
        (all, latest)
    }

    fn irrigate(amount: f64) -> Recommendation {
        Recommendation::new(Action::Irrigate, Priority::Medium, "dry").with_plan(IrrigationPlan {
            amount,
            duration: 10,
            recommended_time: "Evening (18:00-20:00)".to_string(),
            hours_until_next: Some(24),
        })
    }

    fn monitor() -> Recommendation {
        Recommendation::new(Action::Monitor, Priority::Low, "in band")
    }

    #[test]
    fn empty_history_has_no_baseline() {
        let (history, latest) = samples(1);
        let savings = WaterSavingsEstimator::default().estimate(&history, &latest, &[], &monitor());
        assert_eq!(savings.percentage, 0.0);
        assert_eq!(savings.saved, 0.0);
        assert_eq!(savings.fixed_total, 0.0);

        let savings =
            WaterSavingsEstimator::default().estimate(&history, &latest, &[], &irrigate(5.0));
        assert_eq!(savings.percentage, 0.0);
        assert_eq!(savings.actual_total, 5.0);
    }

    #[test]
    fn no_irrigation_saves_everything() {
        let (history, latest) = samples(5);
        let savings = WaterSavingsEstimator::default().estimate(&history, &latest, &[], &monitor());
        assert_eq!(savings.fixed_total, 4.0);
        assert_eq!(savings.saved, 4.0);
        assert_eq!(savings.percentage, 100.0);
    }

    #[test]
    fn logged_irrigation_inside_window_counts() {
        let (history, latest) = samples(5);
        let issued = vec![
            RecommendationRecord::new(at(1), "Wheat", irrigate(1.0)),
            RecommendationRecord::new(at(2), "Wheat", monitor()),
            RecommendationRecord::new(at(2), "Rice", irrigate(3.0)),
            // Before the window
            RecommendationRecord::new(at(-5), "Wheat", irrigate(3.0)),
            // Same instant as the latest sample; `current` stands for it
            RecommendationRecord::new(at(4), "Wheat", irrigate(3.0)),
        ];
        let savings =
            WaterSavingsEstimator::default().estimate(&history, &latest, &issued, &monitor());
        assert_eq!(savings.actual_total, 1.0);
        assert_eq!(savings.saved, 3.0);
        assert_eq!(savings.percentage, 75.0);
    }

    #[test]
    fn overspending_floors_at_zero() {
        let (history, latest) = samples(3);
        let savings =
            WaterSavingsEstimator::default().estimate(&history, &latest, &[], &irrigate(25.0));
        assert_eq!(savings.saved, 0.0);
        assert_eq!(savings.percentage, 0.0);
    }

    #[test]
    fn percentage_always_in_range() {
        let estimator = WaterSavingsEstimator::new(WaterSavingsConfig {
            fixed_dose_per_interval: 2.5,
        });
        for count in 1..8 {
            let (history, latest) = samples(count);
            for amount in [0.0, 0.5, 3.0, 50.0] {
                let s = estimator.estimate(&history, &latest, &[], &irrigate(amount));
                assert!((0.0..=100.0).contains(&s.percentage));
                assert!(s.saved >= 0.0);
            }
        }
    }
}
