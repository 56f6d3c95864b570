use super::recommendation::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert type. Detected alerts use the named variants; alerts logged by
/// operators or external feeds may carry any label, kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    DryStress,
    OverIrrigation,
    LeakSuspected,
    SensorDropout,
    NutrientDeficiency,
    /// Logged by an operator or an external system.
    Manual,
    Other(String),
}

impl AlertKind {
    pub fn as_str(&self) -> &str {
        match self {
            AlertKind::DryStress => "DryStress",
            AlertKind::OverIrrigation => "OverIrrigation",
            AlertKind::LeakSuspected => "LeakSuspected",
            AlertKind::SensorDropout => "SensorDropout",
            AlertKind::NutrientDeficiency => "NutrientDeficiency",
            AlertKind::Manual => "Manual",
            AlertKind::Other(label) => label,
        }
    }

    /// Known variants only; see `From<String>` for the lossless parse.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "drystress" | "dry stress" => Some(AlertKind::DryStress),
            "overirrigation" | "over irrigation" => Some(AlertKind::OverIrrigation),
            "leaksuspected" | "leak suspected" | "leak" => Some(AlertKind::LeakSuspected),
            "sensordropout" | "sensor dropout" => Some(AlertKind::SensorDropout),
            "nutrientdeficiency" | "nutrient deficiency" => Some(AlertKind::NutrientDeficiency),
            "manual" => Some(AlertKind::Manual),
            _ => None,
        }
    }
}

impl From<String> for AlertKind {
    fn from(s: String) -> Self {
        AlertKind::from_str(&s).unwrap_or(AlertKind::Other(s))
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    #[default]
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "Active",
            AlertStatus::Resolved => "Resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AlertStatus::Active),
            "resolved" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSource {
    /// Recomputed by the anomaly detector on every request.
    #[default]
    Detected,
    /// Read back from storage.
    Logged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: Priority,
    /// 0-100
    pub confidence: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default)]
    pub source: AlertSource,
}

impl Alert {
    /// Detected alert keyed by kind and triggering sample time, so repeated
    /// detection over the same input yields the same identity.
    pub fn detected(
        kind: AlertKind,
        severity: Priority,
        confidence: u8,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", kind.as_str(), timestamp.timestamp_millis()),
            kind,
            severity,
            confidence: confidence.min(100),
            message: message.into(),
            timestamp,
            status: AlertStatus::Active,
            source: AlertSource::Detected,
        }
    }

    /// Distinguishes several alerts of one kind raised by the same sample.
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.id = format!(
            "{}-{}-{}",
            self.kind.as_str(),
            subject.to_lowercase(),
            self.timestamp.timestamp_millis()
        );
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}
