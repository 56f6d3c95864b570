use super::{AnomalyContext, AnomalyRule};
use crate::config::AnomalyConfig;
use crate::logic::calculations::confidence;
use crate::models::{Alert, AlertKind, Priority, TelemetrySample};

const REPEAT_CONFIDENCE_SLOPE: f64 = 5.0;
const MIN_PLAUSIBLE_TEMPERATURE_C: f64 = -40.0;
const MAX_PLAUSIBLE_TEMPERATURE_C: f64 = 60.0;

/// Sensor dropout rule - frozen or physically impossible readings
///
/// A probe that stops updating keeps reporting the exact same value. More than
/// `dropout_run` identical readings in a row is flagged per channel. Readings
/// outside the physical range of the probe are flagged on the latest sample.
pub struct SensorDropoutRule;

impl AnomalyRule for SensorDropoutRule {
    fn id(&self) -> &'static str {
        "sensor_dropout"
    }

    fn name(&self) -> &'static str {
        "Sensor Dropout"
    }

    fn evaluate(&self, ctx: &AnomalyContext<'_>, config: &AnomalyConfig) -> Vec<Alert> {
        let mut alerts = Vec::new();

        let channels: [(&str, fn(&TelemetrySample) -> Option<f64>); 2] = [
            ("moisture", |s| s.soil.moisture),
            ("temperature", |s| s.weather.temperature),
        ];

        for (channel, read) in channels {
            let Some(value) = read(ctx.latest) else {
                continue;
            };
            let run = ctx
                .timeline
                .iter()
                .rev()
                .take_while(|s| read(s) == Some(value))
                .count();

            if run <= config.dropout_run {
                continue;
            }

            let severity = if run > config.dropout_run * 2 {
                Priority::High
            } else {
                Priority::Medium
            };

            alerts.push(
                Alert::detected(
                    AlertKind::SensorDropout,
                    severity,
                    confidence((run - config.dropout_run) as f64, REPEAT_CONFIDENCE_SLOPE),
                    format!(
                        "{} sensor has reported exactly {:.1} for {} consecutive readings; \
                         probe may be disconnected or frozen",
                        capitalize(channel),
                        value,
                        run
                    ),
                    ctx.latest.timestamp,
                )
                .with_subject(channel),
            );
        }

        alerts.extend(implausible_readings(ctx.latest));
        alerts
    }
}

fn implausible_readings(sample: &TelemetrySample) -> Vec<Alert> {
    let checks = [
        ("moisture", sample.soil.moisture, 0.0, 100.0, "%"),
        ("humidity", sample.weather.humidity, 0.0, 100.0, "%"),
        (
            "temperature",
            sample.weather.temperature,
            MIN_PLAUSIBLE_TEMPERATURE_C,
            MAX_PLAUSIBLE_TEMPERATURE_C,
            "°C",
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(channel, value, min, max, unit)| {
            let value = value?;
            if value.is_finite() && (min..=max).contains(&value) {
                return None;
            }
            Some(
                Alert::detected(
                    AlertKind::SensorDropout,
                    Priority::High,
                    99,
                    format!(
                        "{} reading {}{} is outside the plausible range {}-{}{}; check the sensor",
                        capitalize(channel),
                        value,
                        unit,
                        min,
                        max,
                        unit
                    ),
                    sample.timestamp,
                )
                .with_subject(&format!("{}-range", channel)),
            )
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CropProfile;
    use chrono::{Duration, TimeZone, Utc};

    fn run(samples: Vec<TelemetrySample>) -> Vec<Alert> {
        let (latest, history) = samples.split_last().unwrap();
        let profile = CropProfile::new("Wheat", 30.0, 60.0);
        let ctx = AnomalyContext::new(history, latest, &profile, &[]);
        SensorDropoutRule.evaluate(&ctx, &AnomalyConfig::default())
    }

    fn series(count: usize, moisture: impl Fn(usize) -> f64, temp: impl Fn(usize) -> f64) -> Vec<TelemetrySample> {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                TelemetrySample::new(base + Duration::minutes(i as i64 * 10), "Wheat")
                    .with_moisture(moisture(i))
                    .with_weather(temp(i), 50.0)
            })
            .collect()
    }

    #[test]
    fn frozen_moisture_probe_is_flagged() {
        let alerts = run(series(7, |_| 41.0, |i| 20.0 + i as f64));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::SensorDropout);
        assert_eq!(alerts[0].severity, Priority::Medium);
        assert_eq!(alerts[0].confidence, 55);
        assert!(alerts[0].id.contains("moisture"));
    }

    #[test]
    fn short_repeats_are_normal() {
        assert!(run(series(6, |_| 41.0, |i| 20.0 + i as f64)).is_empty());
    }

    #[test]
    fn both_channels_frozen_raise_two_alerts() {
        let alerts = run(series(13, |_| 41.0, |_| 22.5));
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Priority::High));
        assert_ne!(alerts[0].id, alerts[1].id);
    }

    #[test]
    fn impossible_values_are_flagged() {
        let alerts = run(series(2, |i| if i == 1 { 140.0 } else { 40.0 }, |_| 20.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Priority::High);
        assert!(alerts[0].message.contains("Moisture reading 140"));

        let alerts = run(series(2, |i| 40.0 + i as f64, |i| if i == 1 { 85.0 } else { 20.0 }));
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].id.contains("temperature-range"));
    }
}
