use super::crop_profile::Nutrient;
use crate::error::{AgriError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoilType {
    Sandy,
    SandyLoam,
    #[default]
    Loam,
    SiltLoam,
    ClayLoam,
    Clay,
    Unknown,
}

impl SoilType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Sandy => "Sandy",
            SoilType::SandyLoam => "Sandy Loam",
            SoilType::Loam => "Loam",
            SoilType::SiltLoam => "Silt Loam",
            SoilType::ClayLoam => "Clay Loam",
            SoilType::Clay => "Clay",
            SoilType::Unknown => "Unknown",
        }
    }

    /// Lenient parse of the free-form soil labels found in telemetry.
    pub fn parse_lossy(s: &str) -> Self {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "sand" | "sandy" => SoilType::Sandy,
            "sandyloam" | "loamysand" => SoilType::SandyLoam,
            "loam" | "loamy" => SoilType::Loam,
            "siltloam" | "silt" | "silty" => SoilType::SiltLoam,
            "clayloam" => SoilType::ClayLoam,
            "clay" | "clayey" => SoilType::Clay,
            _ => SoilType::Unknown,
        }
    }

    /// Relative volume per session. Fast-draining soils take a larger dose.
    pub fn volume_factor(&self) -> f64 {
        match self {
            SoilType::Sandy => 1.3,
            SoilType::SandyLoam => 1.15,
            SoilType::Loam | SoilType::Unknown => 1.0,
            SoilType::SiltLoam => 0.95,
            SoilType::ClayLoam => 0.9,
            SoilType::Clay => 0.8,
        }
    }

    /// Infiltration rate in L/m² per minute.
    pub fn infiltration_rate(&self) -> f64 {
        match self {
            SoilType::Sandy => 1.0,
            SoilType::SandyLoam => 0.8,
            SoilType::Loam | SoilType::Unknown => 0.6,
            SoilType::SiltLoam => 0.5,
            SoilType::ClayLoam => 0.4,
            SoilType::Clay => 0.3,
        }
    }

    /// Multiplier on the base re-irrigation interval.
    pub fn retention_factor(&self) -> f64 {
        match self {
            SoilType::Sandy => 0.5,
            SoilType::SandyLoam => 0.75,
            SoilType::Loam | SoilType::Unknown => 1.0,
            SoilType::SiltLoam => 1.1,
            SoilType::ClayLoam => 1.25,
            SoilType::Clay => 1.5,
        }
    }
}

impl std::fmt::Display for SoilType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilReading {
    /// Volumetric moisture, percent 0-100.
    #[serde(default)]
    pub moisture: Option<f64>,
    /// mg/kg
    #[serde(default)]
    pub nitrogen: Option<f64>,
    #[serde(default)]
    pub phosphorus: Option<f64>,
    #[serde(default)]
    pub potassium: Option<f64>,
    #[serde(default)]
    pub soil_type: String,
}

impl SoilReading {
    pub fn soil_kind(&self) -> SoilType {
        SoilType::parse_lossy(&self.soil_type)
    }

    pub fn nutrient(&self, nutrient: Nutrient) -> Option<f64> {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    /// °C
    #[serde(default)]
    pub temperature: Option<f64>,
    /// percent 0-100
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub timestamp: DateTime<Utc>,
    pub crop_type: String,
    #[serde(default)]
    pub soil: SoilReading,
    #[serde(default)]
    pub weather: WeatherReading,
    #[serde(default)]
    pub fertilizer_name: String,
}

impl TelemetrySample {
    pub fn new(timestamp: DateTime<Utc>, crop_type: impl Into<String>) -> Self {
        Self {
            timestamp,
            crop_type: crop_type.into(),
            soil: SoilReading::default(),
            weather: WeatherReading::default(),
            fertilizer_name: String::new(),
        }
    }

    pub fn with_moisture(mut self, moisture: f64) -> Self {
        self.soil.moisture = Some(moisture);
        self
    }

    pub fn with_weather(mut self, temperature: f64, humidity: f64) -> Self {
        self.weather.temperature = Some(temperature);
        self.weather.humidity = Some(humidity);
        self
    }

    pub fn with_soil_type(mut self, soil_type: impl Into<String>) -> Self {
        self.soil.soil_type = soil_type.into();
        self
    }

    pub fn with_nutrients(mut self, nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        self.soil.nitrogen = Some(nitrogen);
        self.soil.phosphorus = Some(phosphorus);
        self.soil.potassium = Some(potassium);
        self
    }

    /// Moisture reading required by every engine component.
    pub fn moisture(&self) -> Result<f64> {
        match self.soil.moisture {
            Some(m) if m.is_finite() => Ok(m),
            Some(m) => Err(AgriError::InvalidInput(format!(
                "sample at {} has non-finite soil moisture {}",
                self.timestamp, m
            ))),
            None => Err(AgriError::InvalidInput(format!(
                "sample at {} is missing soil moisture",
                self.timestamp
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_type_parse_lossy_variants() {
        assert_eq!(SoilType::parse_lossy("Sandy"), SoilType::Sandy);
        assert_eq!(SoilType::parse_lossy("sandy loam"), SoilType::SandyLoam);
        assert_eq!(SoilType::parse_lossy("SandyLoam"), SoilType::SandyLoam);
        assert_eq!(SoilType::parse_lossy("Clay-Loam"), SoilType::ClayLoam);
        assert_eq!(SoilType::parse_lossy("CLAY"), SoilType::Clay);
        assert_eq!(SoilType::parse_lossy("Red Soil"), SoilType::Unknown);
        assert_eq!(SoilType::parse_lossy(""), SoilType::Unknown);
    }

    #[test]
    fn sandy_soil_drains_faster_than_clay() {
        assert!(SoilType::Sandy.volume_factor() > SoilType::Clay.volume_factor());
        assert!(SoilType::Sandy.infiltration_rate() > SoilType::Clay.infiltration_rate());
        assert!(SoilType::Sandy.retention_factor() < SoilType::Clay.retention_factor());
    }

    #[test]
    fn moisture_missing_is_invalid_input() {
        let sample = TelemetrySample::new(Utc::now(), "Wheat");
        assert!(matches!(sample.moisture(), Err(AgriError::InvalidInput(_))));

        let sample = sample.with_moisture(f64::NAN);
        assert!(matches!(sample.moisture(), Err(AgriError::InvalidInput(_))));
    }

    #[test]
    fn deserializes_camel_case_document() {
        let json = r#"{
            "timestamp": "2024-06-01T06:00:00Z",
            "cropType": "Wheat",
            "soil": {"moisture": 41.5, "nitrogen": 60, "soilType": "Loamy"},
            "weather": {"temperature": 24.1, "humidity": 58},
            "fertilizerName": "Urea"
        }"#;
        let sample: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.crop_type, "Wheat");
        assert_eq!(sample.soil.moisture, Some(41.5));
        assert_eq!(sample.soil.phosphorus, None);
        assert_eq!(sample.soil.soil_kind(), SoilType::Loam);
        assert_eq!(sample.weather.humidity, Some(58.0));
        assert_eq!(sample.fertilizer_name, "Urea");
    }
}
