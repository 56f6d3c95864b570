use crate::config::OpenWeatherMapConfig;
use crate::error::{AgriError, Result};
use crate::models::CurrentWeather;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

pub struct OpenWeatherMapClient {
    client: reqwest::Client,
    config: OpenWeatherMapConfig,
    base_url: String,
}

// OpenWeatherMap API response structures
#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    #[serde(default)]
    wind: Option<OwmWind>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    #[serde(default)]
    temp: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

impl OpenWeatherMapClient {
    pub fn new(config: OpenWeatherMapConfig) -> Self {
        Self::with_base_url(config, API_BASE_URL)
    }

    pub fn with_base_url(config: OpenWeatherMapConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            base_url: base_url.into(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    fn current_url(&self) -> String {
        format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.base_url, self.config.latitude, self.config.longitude, self.config.api_key
        )
    }

    /// Fetch current conditions in metric units
    pub async fn fetch_current(&self) -> Result<CurrentWeather> {
        let response = self
            .client
            .get(self.current_url())
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| AgriError::UpstreamUnavailable(format!("OpenWeatherMap: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgriError::UpstreamUnavailable(format!(
                "OpenWeatherMap returned {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgriError::UpstreamUnavailable(format!("OpenWeatherMap: {}", e)))?;

        parse_current(&body)
    }

    /// Test connection to OpenWeatherMap API
    pub async fn test_connection(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.current_url())
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| AgriError::UpstreamUnavailable(format!("OpenWeatherMap: {}", e)))?;

        Ok(response.status().is_success())
    }
}

fn parse_current(body: &str) -> Result<CurrentWeather> {
    let owm: OwmCurrentResponse = serde_json::from_str(body).map_err(|e| {
        AgriError::UpstreamUnavailable(format!(
            "Failed to parse OpenWeatherMap response: {}",
            e
        ))
    })?;

    let fetched_at = owm
        .dt
        .and_then(|dt| DateTime::from_timestamp(dt, 0))
        .unwrap_or_else(Utc::now);

    Ok(CurrentWeather {
        temperature: owm.main.temp,
        humidity: owm.main.humidity,
        description: owm.weather.into_iter().next().map(|w| w.description),
        wind_speed: owm.wind.map(|w| w.speed),
        location: owm.name.filter(|n| !n.is_empty()),
        fetched_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> OpenWeatherMapConfig {
        OpenWeatherMapConfig {
            api_key: "test_key".to_string(),
            latitude: 18.5204,
            longitude: 73.8567,
            enabled: true,
            timeout_secs: 3,
        }
    }

    #[test]
    fn client_creation() {
        let client = OpenWeatherMapClient::new(sample_config());
        assert!(client.config.enabled);
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert!(client.current_url().ends_with("&units=metric"));
        assert!(client.current_url().contains("lat=18.5204"));
    }

    #[test]
    fn parses_current_weather() {
        let body = r#"{
            "coord": { "lon": 73.86, "lat": 18.52 },
            "weather": [{ "id": 802, "main": "Clouds", "description": "scattered clouds" }],
            "main": { "temp": 29.4, "feels_like": 30.1, "humidity": 48, "pressure": 1009 },
            "wind": { "speed": 4.1, "deg": 270 },
            "dt": 1717225200,
            "name": "Pune"
        }"#;

        let weather = parse_current(body).unwrap();
        assert_eq!(weather.temperature, Some(29.4));
        assert_eq!(weather.humidity, Some(48.0));
        assert_eq!(weather.description.as_deref(), Some("scattered clouds"));
        assert_eq!(weather.wind_speed, Some(4.1));
        assert_eq!(weather.location.as_deref(), Some("Pune"));
        assert_eq!(weather.fetched_at.timestamp(), 1717225200);
    }

    #[test]
    fn sparse_response_leaves_fields_empty() {
        let weather = parse_current(r#"{ "main": {} }"#).unwrap();
        assert_eq!(weather.temperature, None);
        assert_eq!(weather.humidity, None);
        assert!(weather.description.is_none());
    }

    #[test]
    fn malformed_response_is_upstream_error() {
        assert!(matches!(
            parse_current("<html>bad gateway</html>"),
            Err(AgriError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_upstream_error() {
        let client = OpenWeatherMapClient::with_base_url(sample_config(), "http://127.0.0.1:9");
        assert!(matches!(
            client.fetch_current().await,
            Err(AgriError::UpstreamUnavailable(_))
        ));
    }
}
