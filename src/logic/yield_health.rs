use super::calculations::{linear_decay, mean};
use crate::config::YieldHealthConfig;
use crate::error::Result;
use crate::models::{CropProfile, Nutrient, TelemetrySample, YieldHealth};

/// Weighted composite of moisture compliance, nutrient balance and weather
/// comfort. Each sub-score is in [0, 1]; 1.0 is ideal.
pub struct YieldHealthScorer {
    config: YieldHealthConfig,
}

impl YieldHealthScorer {
    pub fn new(config: YieldHealthConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, sample: &TelemetrySample, profile: &CropProfile) -> Result<YieldHealth> {
        let moisture = sample.moisture()?;
        profile.validate()?;

        let parts = [
            (self.config.moisture_weight, self.moisture_score(moisture, profile)),
            (self.config.nutrient_weight, self.nutrient_score(sample, profile)),
            (self.config.weather_weight, self.weather_score(sample)),
        ];

        let total_weight: f64 = parts.iter().map(|(w, _)| w.max(0.0)).sum();
        let raw = if total_weight > 0.0 {
            parts.iter().map(|(w, s)| w.max(0.0) * s).sum::<f64>() / total_weight
        } else {
            0.0
        };

        let health = YieldHealth::from_raw(raw * 100.0);
        tracing::debug!(
            crop_type = %sample.crop_type,
            moisture_score = parts[0].1,
            nutrient_score = parts[1].1,
            weather_score = parts[2].1,
            score = health.value(),
            "Scored yield health"
        );
        Ok(health)
    }

    pub fn moisture_score(&self, moisture: f64, profile: &CropProfile) -> f64 {
        let distance = profile.ideal_moisture_range.distance(moisture);
        linear_decay(distance, self.config.moisture_decay_span)
    }

    /// Neutral (1.0) when the profile has no targets or the sample has no
    /// matching readings.
    pub fn nutrient_score(&self, sample: &TelemetrySample, profile: &CropProfile) -> f64 {
        let scores: Vec<f64> = Nutrient::ALL
            .iter()
            .filter_map(|&nutrient| {
                let band = profile.nutrient_band(nutrient)?;
                let value = sample.soil.nutrient(nutrient).filter(|v| v.is_finite())?;
                // A floor-only target decays over the floor itself
                let span = if band.is_open() {
                    band.min.max(1.0)
                } else if band.width() > 0.0 {
                    band.width()
                } else {
                    band.max.max(1.0)
                };
                Some(linear_decay(band.distance(value), span))
            })
            .collect();

        mean(&scores).unwrap_or(1.0)
    }

    /// Neutral (1.0) when the sample carries no weather.
    pub fn weather_score(&self, sample: &TelemetrySample) -> f64 {
        let cfg = &self.config;
        let mut scores = Vec::with_capacity(2);

        if let Some(t) = sample.weather.temperature.filter(|t| t.is_finite()) {
            scores.push(linear_decay(
                cfg.comfort_temperature.distance(t),
                cfg.temperature_decay_span,
            ));
        }
        if let Some(h) = sample.weather.humidity.filter(|h| h.is_finite()) {
            scores.push(linear_decay(
                cfg.comfort_humidity.distance(h),
                cfg.humidity_decay_span,
            ));
        }

        mean(&scores).unwrap_or(1.0)
    }
}

impl Default for YieldHealthScorer {
    fn default() -> Self {
        Self::new(YieldHealthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgriError;
    use crate::models::{Band, NutrientTargets};
    use chrono::{TimeZone, Utc};

    fn sample(moisture: f64) -> TelemetrySample {
        TelemetrySample::new(Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap(), "Wheat")
            .with_moisture(moisture)
    }

    fn profile() -> CropProfile {
        CropProfile::new("Wheat", 30.0, 60.0)
    }

    #[test]
    fn ideal_sample_scores_maximum() {
        let s = sample(45.0).with_weather(22.0, 60.0);
        let score = YieldHealthScorer::default().score(&s, &profile()).unwrap();
        assert_eq!(score, YieldHealth::MAX);

        // No weather at all is neutral too
        let score = YieldHealthScorer::default().score(&sample(45.0), &profile()).unwrap();
        assert_eq!(score.value(), 100);
    }

    #[test]
    fn moisture_outside_band_decays_linearly() {
        let scorer = YieldHealthScorer::default();
        assert_eq!(scorer.moisture_score(30.0, &profile()), 1.0);
        assert!((scorer.moisture_score(20.0, &profile()) - 0.5).abs() < 1e-9);
        assert_eq!(scorer.moisture_score(90.0, &profile()), 0.0);

        // 0.5 * 0.5 + 0.3 + 0.2 = 0.75
        let score = scorer.score(&sample(20.0), &profile()).unwrap();
        assert_eq!(score.value(), 75);
    }

    #[test]
    fn nutrient_deviation_lowers_score() {
        let profile = profile().with_nutrient_targets(NutrientTargets {
            nitrogen: Some(Band::new(50.0, 90.0)),
            phosphorus: Some(Band::new(20.0, 40.0)),
            potassium: None,
        });
        let scorer = YieldHealthScorer::default();

        let balanced = sample(45.0).with_nutrients(60.0, 30.0, 0.0);
        assert_eq!(scorer.nutrient_score(&balanced, &profile), 1.0);

        // N 20 below its 40-wide band, P 10 below its 20-wide band
        let poor = sample(45.0).with_nutrients(30.0, 10.0, 0.0);
        assert!((scorer.nutrient_score(&poor, &profile) - 0.5).abs() < 1e-9);
        assert_eq!(scorer.score(&poor, &profile).unwrap().value(), 85);
    }

    #[test]
    fn floor_only_nutrient_target_still_penalises() {
        let profile = profile().with_nutrient_targets(NutrientTargets {
            nitrogen: Some(Band::at_least(50.0)),
            ..Default::default()
        });
        let scorer = YieldHealthScorer::default();

        let rich = sample(45.0).with_nutrients(400.0, 0.0, 0.0);
        assert_eq!(scorer.nutrient_score(&rich, &profile), 1.0);

        // 25 below a floor of 50
        let poor = sample(45.0).with_nutrients(25.0, 0.0, 0.0);
        assert!((scorer.nutrient_score(&poor, &profile) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn weather_stress_lowers_score() {
        let scorer = YieldHealthScorer::default();
        let heat = sample(45.0).with_weather(45.0, 10.0);
        assert_eq!(scorer.weather_score(&heat), 0.0);
        assert_eq!(scorer.score(&heat, &profile()).unwrap().value(), 80);
    }

    #[test]
    fn score_is_always_in_range() {
        let scorer = YieldHealthScorer::default();
        for m in [0.0, 10.0, 29.9, 45.0, 60.1, 85.0, 100.0] {
            for (t, h) in [(-10.0, 5.0), (20.0, 60.0), (50.0, 100.0)] {
                let s = sample(m).with_weather(t, h).with_nutrients(0.0, 500.0, 20.0);
                let score = scorer.score(&s, &profile()).unwrap();
                assert!(score.value() <= 100);
            }
        }
    }

    #[test]
    fn rejects_invalid_input() {
        let mut s = sample(45.0);
        s.soil.moisture = None;
        assert!(matches!(
            YieldHealthScorer::default().score(&s, &profile()),
            Err(AgriError::InvalidInput(_))
        ));
        assert!(matches!(
            YieldHealthScorer::default().score(&sample(45.0), &CropProfile::new("Bad", 60.0, 30.0)),
            Err(AgriError::InvalidInput(_))
        ));
    }
}
