use super::calculations::{mean, round1};
use crate::models::{AnalyticsSummary, Band, CropStats, Nutrient, TelemetrySample};

/// Sample-over-sample moisture rise counted as an irrigation event.
pub const IRRIGATION_EVENT_RISE: f64 = 5.0;

/// Summary over a chronological window. Averages skip missing readings;
/// samples without moisture count as outside the band.
pub fn summarize(samples: &[TelemetrySample], band: Band, anomalies: usize) -> AnalyticsSummary {
    if samples.is_empty() {
        return AnalyticsSummary {
            anomalies,
            ..Default::default()
        };
    }

    AnalyticsSummary {
        avg_moisture: average(samples, |s| s.soil.moisture),
        avg_temperature: average(samples, |s| s.weather.temperature),
        irrigation_events: irrigation_events(samples),
        anomalies,
        efficiency: round1(efficiency(samples, band)),
        data_points: samples.len(),
    }
}

pub fn irrigation_events(samples: &[TelemetrySample]) -> usize {
    samples
        .windows(2)
        .filter(|pair| match (pair[0].soil.moisture, pair[1].soil.moisture) {
            (Some(before), Some(after)) => after > before + IRRIGATION_EVENT_RISE,
            _ => false,
        })
        .count()
}

/// Percent of samples whose moisture lies inside `band`.
pub fn efficiency(samples: &[TelemetrySample], band: Band) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let inside = samples
        .iter()
        .filter(|s| s.soil.moisture.is_some_and(|m| band.contains(m)))
        .count();
    inside as f64 / samples.len() as f64 * 100.0
}

pub fn crop_stats(samples: &[TelemetrySample]) -> CropStats {
    CropStats {
        total_records: samples.len(),
        avg_moisture: average(samples, |s| s.soil.moisture),
        avg_temperature: average(samples, |s| s.weather.temperature),
        avg_nitrogen: average(samples, |s| s.soil.nutrient(Nutrient::Nitrogen)),
        avg_phosphorus: average(samples, |s| s.soil.nutrient(Nutrient::Phosphorus)),
        avg_potassium: average(samples, |s| s.soil.nutrient(Nutrient::Potassium)),
    }
}

fn average<F>(samples: &[TelemetrySample], read: F) -> f64
where
    F: Fn(&TelemetrySample) -> Option<f64>,
{
    let values: Vec<f64> = samples
        .iter()
        .filter_map(read)
        .filter(|v| v.is_finite())
        .collect();
    mean(&values).map(round1).unwrap_or(0.0)
}
