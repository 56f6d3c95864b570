use crate::db::Database;
use crate::error::Result;
use crate::models::{
    Alert, AlertKind, AlertSource, AlertStatus, CropProfile, Priority, TelemetrySample,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bulk import document: `{ "crops": [...], "samples": [...], "alerts": [...] }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub crops: Vec<CropProfile>,
    pub samples: Vec<TelemetrySample>,
    pub alerts: Vec<SeedAlert>,
}

/// Manually logged alert; the id is derived when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAlert {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_alert_kind")]
    pub kind: AlertKind,
    #[serde(default)]
    pub severity: Priority,
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: AlertStatus,
}

fn default_alert_kind() -> AlertKind {
    AlertKind::Manual
}

fn default_confidence() -> u8 {
    100
}

impl From<SeedAlert> for Alert {
    fn from(seed: SeedAlert) -> Self {
        let id = seed.id.unwrap_or_else(|| {
            format!(
                "{}-{}",
                seed.kind.as_str(),
                seed.timestamp.timestamp_millis()
            )
        });
        Alert {
            id,
            kind: seed.kind,
            severity: seed.severity,
            confidence: seed.confidence.min(100),
            message: seed.message,
            timestamp: seed.timestamp,
            status: seed.status,
            source: AlertSource::Logged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub crops: usize,
    pub samples: usize,
    pub alerts: usize,
    /// Samples rejected for missing crop type.
    pub skipped: usize,
}

impl SeedData {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Profiles are validated before anything is written.
    pub fn import(self, db: &Database) -> Result<ImportSummary> {
        for crop in &self.crops {
            crop.validate()?;
        }

        let (samples, rejected): (Vec<TelemetrySample>, Vec<TelemetrySample>) = self
            .samples
            .into_iter()
            .partition(|s| !s.crop_type.trim().is_empty());
        if !rejected.is_empty() {
            tracing::warn!(count = rejected.len(), "Skipping samples without a crop type");
        }

        for crop in &self.crops {
            db.upsert_crop_profile(crop)?;
        }
        let inserted = db.insert_samples(&samples)?;

        let alert_count = self.alerts.len();
        for seed in self.alerts {
            db.insert_alert(&Alert::from(seed))?;
        }

        let summary = ImportSummary {
            crops: self.crops.len(),
            samples: inserted,
            alerts: alert_count,
            skipped: rejected.len(),
        };
        tracing::info!(
            crops = summary.crops,
            samples = summary.samples,
            alerts = summary.alerts,
            "Seed data imported"
        );
        Ok(summary)
    }
}
