use super::calculations::{moisture_series, round1, timeline, trend};
use crate::config::RecommendationConfig;
use crate::error::Result;
use crate::models::{
    Action, CropProfile, IrrigationPlan, Priority, Recommendation, SoilType, TelemetrySample,
};

pub const WINDOW_EARLY_MORNING: &str = "Early morning (05:00-08:00)";
pub const WINDOW_EVENING: &str = "Evening (18:00-20:00)";
pub const WINDOW_LATE_EVENING: &str = "Late evening (20:00-22:00)";

/// Decision core: turns the latest sample into Irrigate / Delay / Stop / Monitor.
///
/// Decision order:
/// - Above the ideal band: Stop, priority by excess
/// - Below the ideal band: Irrigate with a soil-aware dose, priority by deficit
/// - In band and falling toward the lower bound: Delay
/// - Otherwise: Monitor
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn recommend(
        &self,
        sample: &TelemetrySample,
        profile: &CropProfile,
        history: &[TelemetrySample],
    ) -> Result<Recommendation> {
        let moisture = sample.moisture()?;
        profile.validate()?;

        let band = profile.ideal_moisture_range;
        let deficit = band.min - moisture;
        let excess = moisture - band.max;

        let recommendation = if excess > 0.0 {
            self.stop(moisture, excess, profile)
        } else if deficit > 0.0 {
            self.irrigate(sample, moisture, deficit, profile)
        } else {
            self.in_band(sample, moisture, profile, history)
        };

        tracing::debug!(
            crop_type = %sample.crop_type,
            moisture,
            action = %recommendation.action,
            priority = %recommendation.priority,
            "Recommendation computed"
        );

        Ok(recommendation)
    }

    fn stop(&self, moisture: f64, excess: f64, profile: &CropProfile) -> Recommendation {
        let priority = if excess > self.config.stop_critical_excess {
            Priority::Critical
        } else if excess > self.config.stop_high_excess {
            Priority::High
        } else {
            Priority::Medium
        };

        Recommendation::new(
            Action::Stop,
            priority,
            format!(
                "moisture {:.1}% vs ideal {}%, excess {:.1}pp; stop irrigation to avoid \
                 waterlogging and root oxygen stress",
                moisture, profile.ideal_moisture_range, excess
            ),
        )
    }

    fn irrigate(
        &self,
        sample: &TelemetrySample,
        moisture: f64,
        deficit: f64,
        profile: &CropProfile,
    ) -> Recommendation {
        let priority = self.deficit_priority(deficit);
        let soil = sample.soil.soil_kind();
        let plan = self.irrigation_plan(sample, deficit, soil);

        let reason = format!(
            "moisture {:.1}% vs ideal {}%, deficit {:.1}pp; apply {:.1} L/m² over {} min \
             on {} soil",
            moisture,
            profile.ideal_moisture_range,
            deficit,
            plan.amount,
            plan.duration,
            soil.as_str().to_lowercase()
        );

        Recommendation::new(Action::Irrigate, priority, reason).with_plan(plan)
    }

    /// Non-decreasing in `deficit`.
    pub fn deficit_priority(&self, deficit: f64) -> Priority {
        if deficit > self.config.irrigate_critical_deficit {
            Priority::Critical
        } else if deficit > self.config.irrigate_high_deficit {
            Priority::High
        } else {
            Priority::Medium
        }
    }

    pub fn irrigation_plan(
        &self,
        sample: &TelemetrySample,
        deficit: f64,
        soil: SoilType,
    ) -> IrrigationPlan {
        let cfg = &self.config;

        let amount = round1(
            (deficit * cfg.litres_per_point * soil.volume_factor())
                .clamp(cfg.min_amount, cfg.max_amount),
        );

        let duration = ((amount / soil.infiltration_rate()).ceil() as u32)
            .clamp(cfg.min_duration_minutes, cfg.max_duration_minutes);

        // Heat shortens the interval before the next session
        let heat_factor = match sample.weather.temperature {
            Some(t) if t >= cfg.hot_temperature => 0.75,
            _ => 1.0,
        };
        let hours_until_next =
            (cfg.base_interval_hours * soil.retention_factor() * heat_factor).round().max(1.0)
                as u32;

        IrrigationPlan {
            amount,
            duration,
            recommended_time: self.recommended_window(sample).to_string(),
            hours_until_next: Some(hours_until_next),
        }
    }

    /// Early morning by default; hot or dry readings push the window later.
    pub fn recommended_window(&self, sample: &TelemetrySample) -> &'static str {
        let cfg = &self.config;
        let hot = sample
            .weather
            .temperature
            .is_some_and(|t| t >= cfg.hot_temperature);
        let warm = sample
            .weather
            .temperature
            .is_some_and(|t| t >= cfg.warm_temperature);
        let dry = sample
            .weather
            .humidity
            .is_some_and(|h| h < cfg.dry_humidity);

        if hot && dry {
            WINDOW_LATE_EVENING
        } else if hot || (warm && dry) {
            WINDOW_EVENING
        } else {
            WINDOW_EARLY_MORNING
        }
    }

    fn in_band(
        &self,
        sample: &TelemetrySample,
        moisture: f64,
        profile: &CropProfile,
        history: &[TelemetrySample],
    ) -> Recommendation {
        let band = profile.ideal_moisture_range;

        if !history.is_empty() {
            // Trend comes from the prior readings only, the latest is judged on its own
            let window = timeline(history, sample);
            let values = moisture_series(&window[..window.len() - 1]);
            if let Some(change) = trend(&values, self.config.trend_window) {
                let headroom = moisture - band.min;
                if change < -self.config.trend_drop_threshold
                    && headroom <= self.config.near_lower_margin
                {
                    return Recommendation::new(
                        Action::Delay,
                        Priority::Medium,
                        format!(
                            "moisture {:.1}% vs ideal {}%, falling {:.1}pp across recent \
                             readings with {:.1}pp left above the lower bound; hold and \
                             schedule irrigation for the next window",
                            moisture,
                            band,
                            -change,
                            headroom
                        ),
                    );
                }
            }
        }

        Recommendation::new(
            Action::Monitor,
            Priority::Low,
            format!(
                "moisture {:.1}% within ideal {}%; no irrigation needed",
                moisture, band
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgriError;
    use chrono::{Duration, TimeZone, Utc};

    fn engine() -> RecommendationEngine {
        RecommendationEngine::new(RecommendationConfig::default())
    }

    fn profile() -> CropProfile {
        CropProfile::new("Wheat", 30.0, 60.0)
    }

    fn at(minutes: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn sample(minutes: i64, moisture: f64) -> TelemetrySample {
        TelemetrySample::new(at(minutes), "Wheat")
            .with_moisture(moisture)
            .with_weather(22.0, 60.0)
            .with_soil_type("Loam")
    }

    fn history(values: &[f64]) -> Vec<TelemetrySample> {
        values
            .iter()
            .enumerate()
            .map(|(i, m)| sample(i as i64 * 15, *m))
            .collect()
    }

    #[test]
    fn dry_sample_irrigates() {
        let rec = engine().recommend(&sample(0, 22.0), &profile(), &[]).unwrap();
        assert_eq!(rec.action, Action::Irrigate);
        assert!(rec.priority >= Priority::Medium);
        let plan = rec.plan.as_ref().unwrap();
        assert!(plan.amount > 0.0);
        assert!(plan.duration > 0);
        assert!(rec.reason.contains("deficit 8.0pp"));
        assert!(rec.reason.contains("30-60"));
    }

    #[test]
    fn wet_sample_stops() {
        let rec = engine().recommend(&sample(0, 75.0), &profile(), &[]).unwrap();
        assert_eq!(rec.action, Action::Stop);
        assert!(rec.priority >= Priority::Medium);
        assert!(rec.plan.is_none());
        assert!(rec.reason.contains("excess 15.0pp"));
    }

    #[test]
    fn stop_priority_scales_with_excess() {
        let e = engine();
        let p = profile();
        assert_eq!(e.recommend(&sample(0, 63.0), &p, &[]).unwrap().priority, Priority::Medium);
        assert_eq!(e.recommend(&sample(0, 70.0), &p, &[]).unwrap().priority, Priority::High);
        assert_eq!(e.recommend(&sample(0, 80.0), &p, &[]).unwrap().priority, Priority::Critical);
    }

    #[test]
    fn irrigate_priority_is_monotonic_in_deficit() {
        let e = engine();
        let p = profile();
        let mut last = Priority::Low;
        for tenth in (0..300).rev() {
            let moisture = tenth as f64 / 10.0;
            let rec = e.recommend(&sample(0, moisture), &p, &[]).unwrap();
            assert_eq!(rec.action, Action::Irrigate, "moisture {}", moisture);
            assert!(rec.applied_amount() > 0.0);
            assert!(rec.priority >= last, "priority dropped at {}", moisture);
            last = rec.priority;
        }
        assert_eq!(last, Priority::Critical);
    }

    #[test]
    fn in_band_with_flat_or_rising_trend_monitors() {
        let e = engine();
        let p = profile();
        for values in [
            vec![40.0, 40.0, 40.0, 40.0, 40.0, 40.0],
            vec![31.0, 32.0, 33.0, 34.0, 35.0, 36.0],
            vec![],
        ] {
            let hist = history(&values);
            for moisture in [30.5, 31.0, 45.0, 59.9] {
                let rec = e.recommend(&sample(200, moisture), &p, &hist).unwrap();
                assert_eq!(rec.action, Action::Monitor, "{:?} at {}", values, moisture);
                assert_eq!(rec.priority, Priority::Low);
            }
        }
    }

    #[test]
    fn falling_trend_near_lower_bound_delays() {
        let hist = history(&[42.0, 41.0, 40.0, 36.0, 35.0]);
        let rec = engine().recommend(&sample(200, 33.0), &profile(), &hist).unwrap();
        assert_eq!(rec.action, Action::Delay);
        assert!(rec.plan.is_none());
        assert!(rec.reason.contains("falling"));
    }

    #[test]
    fn falling_trend_far_from_bound_monitors() {
        let hist = history(&[58.0, 57.0, 56.0, 52.0, 51.0]);
        let rec = engine().recommend(&sample(200, 50.0), &profile(), &hist).unwrap();
        assert_eq!(rec.action, Action::Monitor);
    }

    #[test]
    fn empty_history_never_delays() {
        let rec = engine().recommend(&sample(0, 31.0), &profile(), &[]).unwrap();
        assert_eq!(rec.action, Action::Monitor);
    }

    #[test]
    fn sandy_soil_gets_larger_shorter_sessions() {
        let e = engine();
        let p = profile();
        let sandy = e
            .recommend(&sample(0, 20.0).with_soil_type("Sandy"), &p, &[])
            .unwrap();
        let clay = e
            .recommend(&sample(0, 20.0).with_soil_type("Clay"), &p, &[])
            .unwrap();
        let sandy = sandy.plan.unwrap();
        let clay = clay.plan.unwrap();
        assert!(sandy.amount > clay.amount);
        assert!(sandy.duration < clay.duration);
        assert!(sandy.hours_until_next < clay.hours_until_next);
    }

    #[test]
    fn amount_is_clamped_to_bounds() {
        let e = engine();
        let cfg = RecommendationConfig::default();
        let tiny = e.recommend(&sample(0, 29.9), &profile(), &[]).unwrap();
        assert_eq!(tiny.applied_amount(), cfg.min_amount);

        let huge = e
            .recommend(&sample(0, 0.0), &CropProfile::new("Rice", 95.0, 99.0), &[])
            .unwrap();
        assert_eq!(huge.applied_amount(), cfg.max_amount);
    }

    #[test]
    fn hot_dry_weather_pushes_window_later() {
        let e = engine();
        let mild = sample(0, 20.0).with_weather(20.0, 65.0);
        let warm_dry = sample(0, 20.0).with_weather(27.0, 30.0);
        let hot_dry = sample(0, 20.0).with_weather(36.0, 25.0);
        assert_eq!(e.recommended_window(&mild), WINDOW_EARLY_MORNING);
        assert_eq!(e.recommended_window(&warm_dry), WINDOW_EVENING);
        assert_eq!(e.recommended_window(&hot_dry), WINDOW_LATE_EVENING);

        let mut no_weather = sample(0, 20.0);
        no_weather.weather = Default::default();
        assert_eq!(e.recommended_window(&no_weather), WINDOW_EARLY_MORNING);
    }

    #[test]
    fn missing_moisture_is_invalid_input() {
        let mut s = sample(0, 40.0);
        s.soil.moisture = None;
        let err = engine().recommend(&s, &profile(), &[]).unwrap_err();
        assert!(matches!(err, AgriError::InvalidInput(_)));
    }

    #[test]
    fn inverted_profile_is_invalid_input() {
        let err = engine()
            .recommend(&sample(0, 40.0), &CropProfile::new("Bad", 60.0, 30.0), &[])
            .unwrap_err();
        assert!(matches!(err, AgriError::InvalidInput(_)));
    }
}
