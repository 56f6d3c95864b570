use crate::models::TelemetrySample;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Chronological view of the window ending at `latest`.
///
/// History entries at or after the latest timestamp are dropped so the
/// latest sample is never counted twice, whatever order the caller used.
pub fn timeline<'a>(
    history: &'a [TelemetrySample],
    latest: &'a TelemetrySample,
) -> Vec<&'a TelemetrySample> {
    let mut samples: Vec<&TelemetrySample> = history
        .iter()
        .filter(|s| s.timestamp < latest.timestamp)
        .collect();
    samples.sort_by_key(|s| s.timestamp);
    samples.push(latest);
    samples
}

/// Moisture readings of a chronological window, skipping gaps.
pub fn moisture_series(samples: &[&TelemetrySample]) -> Vec<f64> {
    samples
        .iter()
        .filter_map(|s| s.soil.moisture)
        .filter(|m| m.is_finite())
        .collect()
}

/// Mean of the last `window` values minus the mean of the `window` before.
///
/// Short series shrink the window to half their length; fewer than two
/// values yield no trend.
pub fn trend(values: &[f64], window: usize) -> Option<f64> {
    let n = window.min(values.len() / 2);
    if n == 0 {
        return None;
    }
    let recent = &values[values.len() - n..];
    let previous = &values[values.len() - 2 * n..values.len() - n];
    Some(mean(recent)? - mean(previous)?)
}

/// Number of trailing samples matching `predicate`, newest first.
pub fn trailing_run<F>(samples: &[&TelemetrySample], predicate: F) -> usize
where
    F: Fn(&TelemetrySample) -> bool,
{
    samples.iter().rev().take_while(|s| predicate(s)).count()
}

/// Linear confidence mapping: 50 at the threshold, rising by `slope` per
/// unit past it, capped at 99.
pub fn confidence(overshoot: f64, slope: f64) -> u8 {
    let raw = 50.0 + overshoot.max(0.0) * slope.max(0.0);
    if raw.is_nan() {
        return 50;
    }
    raw.round().clamp(50.0, 99.0) as u8
}

/// 1.0 at zero distance, falling linearly to 0.0 at `span`.
pub fn linear_decay(distance: f64, span: f64) -> f64 {
    if span <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - distance.max(0.0) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample(minutes: i64, moisture: f64) -> TelemetrySample {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        TelemetrySample::new(base + Duration::minutes(minutes), "Wheat").with_moisture(moisture)
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn timeline_sorts_and_deduplicates_latest() {
        let latest = sample(30, 40.0);
        let history = vec![sample(20, 38.0), sample(10, 36.0), sample(30, 40.0)];
        let line = timeline(&history, &latest);
        let values = moisture_series(&line);
        assert_eq!(values, vec![36.0, 38.0, 40.0]);
    }

    #[test]
    fn timeline_of_empty_history_is_latest_only() {
        let latest = sample(0, 45.0);
        assert_eq!(timeline(&[], &latest).len(), 1);
    }

    #[test]
    fn trend_compares_recent_to_previous_window() {
        let values = [50.0, 50.0, 50.0, 44.0, 44.0, 44.0];
        assert_eq!(trend(&values, 3), Some(-6.0));
        // Window shrinks for short series
        assert_eq!(trend(&[40.0, 42.0], 3), Some(2.0));
        assert_eq!(trend(&[40.0], 3), None);
        assert_eq!(trend(&[], 3), None);
    }

    #[test]
    fn trailing_run_counts_from_newest() {
        let samples = [sample(0, 20.0), sample(5, 40.0), sample(10, 20.0), sample(15, 21.0)];
        let refs: Vec<&TelemetrySample> = samples.iter().collect();
        let run = trailing_run(&refs, |s| s.soil.moisture.is_some_and(|m| m < 25.0));
        assert_eq!(run, 2);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(confidence(0.0, 3.0), 50);
        assert_eq!(confidence(-5.0, 3.0), 50);
        assert_eq!(confidence(10.0, 3.0), 80);
        assert_eq!(confidence(100.0, 3.0), 99);
    }

    #[test]
    fn linear_decay_bounds() {
        assert_eq!(linear_decay(0.0, 20.0), 1.0);
        assert_eq!(linear_decay(10.0, 20.0), 0.5);
        assert_eq!(linear_decay(40.0, 20.0), 0.0);
        assert_eq!(linear_decay(1.0, 0.0), 0.0);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round1(41.26), 41.3);
        assert_eq!(round2(1.23456), 1.23);
    }
}
