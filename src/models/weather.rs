use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions reported by an external weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    /// °C
    pub temperature: Option<f64>,
    /// percent 0-100
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl CurrentWeather {
    pub fn new(temperature: Option<f64>, humidity: Option<f64>) -> Self {
        Self {
            temperature,
            humidity,
            description: None,
            wind_speed: None,
            location: None,
            fetched_at: Utc::now(),
        }
    }
}
