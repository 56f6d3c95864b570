use super::{
    Alert, CropProfile, CurrentWeather, Priority, Recommendation, TelemetrySample, WaterSavings,
    YieldHealth,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Live status of the most recently reporting field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Latest sample after weather enrichment.
    pub sensor_data: TelemetrySample,
    pub recommendation: Recommendation,
    /// Detected alerts first, then persisted active alerts.
    pub alerts: Vec<Alert>,
    pub crop: CropProfile,
    pub yield_health: YieldHealth,
    pub water_savings: WaterSavings,
    pub weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub avg_moisture: f64,
    pub avg_temperature: f64,
    pub irrigation_events: usize,
    /// Alerts logged inside the window.
    pub anomalies: usize,
    /// Share of samples inside the ideal band, percent.
    pub efficiency: f64,
    pub data_points: usize,
}

/// One synthesized field per crop type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatus {
    pub field_id: String,
    pub field_name: String,
    pub crop: String,
    pub moisture: f64,
    pub temperature: Option<f64>,
    pub recommendation: Recommendation,
    pub yield_health: YieldHealth,
    pub status: Priority,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSummary {
    pub crop_type: String,
    pub crop: Option<CropProfile>,
    pub record_count: u64,
    pub latest_data: Option<TelemetrySample>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropStats {
    pub total_records: usize,
    pub avg_moisture: f64,
    pub avg_temperature: f64,
    pub avg_nitrogen: f64,
    pub avg_phosphorus: f64,
    pub avg_potassium: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CropDetail {
    pub crop_type: String,
    pub crop: Option<CropProfile>,
    /// Chronological.
    pub data: Vec<TelemetrySample>,
    pub stats: CropStats,
}

/// Output of `check`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub database: String,
    pub crops: u64,
    pub sensor_data: u64,
    pub alerts: u64,
    pub recommendations: u64,
    /// `None` when no weather provider is configured.
    pub weather: Option<bool>,
}
