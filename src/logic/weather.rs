use crate::models::{CurrentWeather, TelemetrySample};

/// Merges an external weather reading onto a sample.
///
/// Only finite external values override the sample's own readings; when the
/// fetch failed or returned nothing the embedded weather is kept.
pub struct WeatherEnricher;

impl WeatherEnricher {
    pub fn enrich(sample: &TelemetrySample, current: Option<&CurrentWeather>) -> TelemetrySample {
        let mut enriched = sample.clone();
        let Some(current) = current else {
            return enriched;
        };

        if let Some(t) = current.temperature.filter(|t| t.is_finite()) {
            enriched.weather.temperature = Some(t);
        }
        if let Some(h) = current.humidity.filter(|h| h.is_finite()) {
            enriched.weather.humidity = Some(h);
        }

        tracing::debug!(
            crop_type = %enriched.crop_type,
            temperature = ?enriched.weather.temperature,
            humidity = ?enriched.weather.humidity,
            "Enriched sample with current weather"
        );
        enriched
    }
}
