use crate::db::Database;
use crate::error::{AgriError, Result};
use crate::models::{
    Action, Alert, AlertKind, AlertSource, AlertStatus, Band, CropProfile, IrrigationPlan,
    NutrientTargets, Priority, Recommendation, RecommendationRecord, SoilReading,
    TelemetrySample, WeatherReading,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};
use tracing::warn;

/// Fixed-width UTC so stored timestamps sort and compare as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// SQLite treats a negative LIMIT as unbounded.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l.min(i64::MAX as usize) as i64).unwrap_or(-1)
}

// Telemetry Queries

impl Database {
    /// Inserts or replaces the sample keyed by crop type and timestamp.
    pub fn insert_sample(&self, sample: &TelemetrySample) -> Result<()> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(INSERT_SAMPLE)?;
            execute_insert_sample(&mut stmt, sample)?;
            Ok(())
        })
    }

    pub fn insert_samples(&self, samples: &[TelemetrySample]) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(INSERT_SAMPLE)?;
                for sample in samples {
                    execute_insert_sample(&mut stmt, sample)?;
                }
            }
            tx.commit()?;
            Ok(samples.len())
        })
    }

    pub fn latest_sample(&self) -> Result<Option<TelemetrySample>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM telemetry ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                row_to_sample,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn latest_sample_for_crop(&self, crop_type: &str) -> Result<Option<TelemetrySample>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM telemetry WHERE crop_type = ?1 ORDER BY timestamp DESC, id DESC LIMIT 1",
                [crop_type],
                row_to_sample,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Newest first.
    pub fn recent_samples_for_crop(
        &self,
        crop_type: &str,
        limit: usize,
    ) -> Result<Vec<TelemetrySample>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM telemetry WHERE crop_type = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let samples = stmt
                .query_map(params![crop_type, sql_limit(Some(limit))], row_to_sample)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
    }

    /// Samples at or after `cutoff`, newest first, across all crops.
    pub fn samples_since(
        &self,
        cutoff: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<TelemetrySample>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM telemetry WHERE timestamp >= ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let samples = stmt
                .query_map(
                    params![format_timestamp(&cutoff), sql_limit(limit)],
                    row_to_sample,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
    }

    /// Samples of one crop at or after `cutoff`, newest first.
    pub fn crop_samples_since(
        &self,
        crop_type: &str,
        cutoff: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<TelemetrySample>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM telemetry
                WHERE crop_type = ?1 AND timestamp >= ?2
                ORDER BY timestamp DESC, id DESC
                LIMIT ?3
                "#,
            )?;
            let samples = stmt
                .query_map(
                    params![crop_type, format_timestamp(&cutoff), sql_limit(limit)],
                    row_to_sample,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
    }

    /// Latest sample of every crop type, ordered by crop type.
    pub fn latest_samples_by_crop(&self) -> Result<Vec<TelemetrySample>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT t.* FROM telemetry t
                WHERE t.id = (
                    SELECT i.id FROM telemetry i
                    WHERE i.crop_type = t.crop_type
                    ORDER BY i.timestamp DESC, i.id DESC
                    LIMIT 1
                )
                ORDER BY t.crop_type
                "#,
            )?;
            let samples = stmt
                .query_map([], row_to_sample)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
    }

    pub fn crop_types(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT crop_type FROM telemetry WHERE crop_type <> '' ORDER BY crop_type",
            )?;
            let types = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(types)
        })
    }

    pub fn count_samples(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM telemetry", [])
    }

    pub fn count_samples_for_crop(&self, crop_type: &str) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM telemetry WHERE crop_type = ?1",
            [crop_type],
        )
    }

    fn count<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(sql, params, |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
    }
}

const INSERT_SAMPLE: &str = r#"
    INSERT OR REPLACE INTO telemetry
        (timestamp, crop_type, moisture, nitrogen, phosphorus, potassium,
         soil_type, temperature, humidity, fertilizer_name)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
"#;

fn execute_insert_sample(
    stmt: &mut rusqlite::Statement<'_>,
    sample: &TelemetrySample,
) -> rusqlite::Result<usize> {
    stmt.execute(params![
        format_timestamp(&sample.timestamp),
        sample.crop_type,
        sample.soil.moisture,
        sample.soil.nitrogen,
        sample.soil.phosphorus,
        sample.soil.potassium,
        sample.soil.soil_type,
        sample.weather.temperature,
        sample.weather.humidity,
        sample.fertilizer_name,
    ])
}

fn row_to_sample(row: &Row) -> rusqlite::Result<TelemetrySample> {
    let timestamp_str: String = row.get("timestamp")?;

    Ok(TelemetrySample {
        timestamp: parse_timestamp(&timestamp_str)?,
        crop_type: row.get("crop_type")?,
        soil: SoilReading {
            moisture: row.get("moisture")?,
            nitrogen: row.get("nitrogen")?,
            phosphorus: row.get("phosphorus")?,
            potassium: row.get("potassium")?,
            soil_type: row.get("soil_type")?,
        },
        weather: WeatherReading {
            temperature: row.get("temperature")?,
            humidity: row.get("humidity")?,
        },
        fertilizer_name: row.get("fertilizer_name")?,
    })
}

// Crop Profile Queries

impl Database {
    pub fn upsert_crop_profile(&self, profile: &CropProfile) -> Result<()> {
        profile.validate()?;
        let band = |b: Option<Band>| {
            (b.map(|b| b.min), b.map(|b| b.max).filter(|max| max.is_finite()))
        };
        let targets = profile.nutrient_targets.unwrap_or_default();
        let (n_min, n_max) = band(targets.nitrogen);
        let (p_min, p_max) = band(targets.phosphorus);
        let (k_min, k_max) = band(targets.potassium);

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO crop_profiles
                    (name, moisture_min, moisture_max, nitrogen_min, nitrogen_max,
                     phosphorus_min, phosphorus_max, potassium_min, potassium_max)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(name) DO UPDATE SET
                    moisture_min = excluded.moisture_min,
                    moisture_max = excluded.moisture_max,
                    nitrogen_min = excluded.nitrogen_min,
                    nitrogen_max = excluded.nitrogen_max,
                    phosphorus_min = excluded.phosphorus_min,
                    phosphorus_max = excluded.phosphorus_max,
                    potassium_min = excluded.potassium_min,
                    potassium_max = excluded.potassium_max
                "#,
                params![
                    profile.name,
                    profile.ideal_moisture_range.min,
                    profile.ideal_moisture_range.max,
                    n_min,
                    n_max,
                    p_min,
                    p_max,
                    k_min,
                    k_max,
                ],
            )?;
            Ok(())
        })
    }

    /// Exact-name lookup; `ConfigurationMissing` when the crop has no profile.
    pub fn get_crop_profile(&self, name: &str) -> Result<CropProfile> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM crop_profiles WHERE name = ?1",
                [name],
                row_to_crop_profile,
            )
            .optional()?
            .ok_or_else(|| {
                AgriError::ConfigurationMissing(format!("no crop profile stored for '{}'", name))
            })
        })
    }

    pub fn count_crop_profiles(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM crop_profiles", [])
    }
}

fn row_to_crop_profile(row: &Row) -> rusqlite::Result<CropProfile> {
    let band = |min: &str, max: &str| -> rusqlite::Result<Option<Band>> {
        let min: Option<f64> = row.get(min)?;
        let max: Option<f64> = row.get(max)?;
        Ok(match (min, max) {
            (Some(min), Some(max)) => Some(Band::new(min, max)),
            (Some(min), None) => Some(Band::at_least(min)),
            (None, Some(max)) => Some(Band::new(0.0, max)),
            (None, None) => None,
        })
    };

    let targets = NutrientTargets {
        nitrogen: band("nitrogen_min", "nitrogen_max")?,
        phosphorus: band("phosphorus_min", "phosphorus_max")?,
        potassium: band("potassium_min", "potassium_max")?,
    };

    let mut profile = CropProfile::new(
        row.get::<_, String>("name")?,
        row.get("moisture_min")?,
        row.get("moisture_max")?,
    );
    if !targets.is_empty() {
        profile = profile.with_nutrient_targets(targets);
    }
    Ok(profile)
}

// Alert Queries

impl Database {
    pub fn insert_alert(&self, alert: &Alert) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO alerts
                    (id, alert_type, severity, confidence, message, timestamp, status)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    alert.id,
                    alert.kind.as_str(),
                    alert.severity.as_str(),
                    alert.confidence,
                    alert.message,
                    format_timestamp(&alert.timestamp),
                    alert.status.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    /// Active alerts, newest first.
    pub fn active_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM alerts WHERE status = 'Active' ORDER BY timestamp DESC, id LIMIT ?1",
            )?;
            let alerts = stmt
                .query_map([sql_limit(Some(limit))], row_to_alert)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(alerts)
        })
    }

    pub fn count_alerts_since(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) FROM alerts WHERE timestamp >= ?1",
            [format_timestamp(&cutoff)],
        )
    }

    pub fn count_alerts(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM alerts", [])
    }
}

fn row_to_alert(row: &Row) -> rusqlite::Result<Alert> {
    let kind_str: String = row.get("alert_type")?;
    let severity_str: String = row.get("severity")?;
    let status_str: String = row.get("status")?;
    let timestamp_str: String = row.get("timestamp")?;
    let confidence: i64 = row.get("confidence")?;

    // Labels outside the detector's vocabulary are kept as written
    let kind = AlertKind::from(kind_str);
    let severity = Priority::from_str(&severity_str).unwrap_or_else(|| {
        warn!(severity = %severity_str, "Unknown severity in database, defaulting to Low");
        Priority::Low
    });
    let status = AlertStatus::from_str(&status_str).unwrap_or_else(|| {
        warn!(status = %status_str, "Unknown alert status in database, defaulting to Active");
        AlertStatus::Active
    });

    Ok(Alert {
        id: row.get("id")?,
        kind,
        severity,
        confidence: confidence.clamp(0, 100) as u8,
        message: row.get("message")?,
        timestamp: parse_timestamp(&timestamp_str)?,
        status,
        source: AlertSource::Logged,
    })
}

// Recommendation Log Queries

impl Database {
    /// One entry per crop and sample time; re-evaluating a sample replaces it.
    pub fn log_recommendation(&self, record: &RecommendationRecord) -> Result<()> {
        let rec = &record.recommendation;
        let plan = rec.plan.as_ref();

        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO recommendation_log
                    (timestamp, crop_type, action, priority, reason, amount,
                     duration_minutes, recommended_time, hours_until_next)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    format_timestamp(&record.timestamp),
                    record.crop_type,
                    rec.action.as_str(),
                    rec.priority.as_str(),
                    rec.reason,
                    plan.map(|p| p.amount),
                    plan.map(|p| p.duration),
                    plan.map(|p| p.recommended_time.as_str()),
                    plan.and_then(|p| p.hours_until_next),
                ],
            )?;
            Ok(())
        })
    }

    /// Log entries for a crop at or after `since`, oldest first.
    pub fn recommendations_since(
        &self,
        crop_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecommendationRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM recommendation_log
                WHERE crop_type = ?1 AND timestamp >= ?2
                ORDER BY timestamp, id
                "#,
            )?;
            let records = stmt
                .query_map(
                    params![crop_type, format_timestamp(&since)],
                    row_to_recommendation,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    /// Newest first.
    pub fn recent_recommendations(&self, limit: usize) -> Result<Vec<RecommendationRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM recommendation_log ORDER BY timestamp DESC, id DESC LIMIT ?1",
            )?;
            let records = stmt
                .query_map([sql_limit(Some(limit))], row_to_recommendation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    pub fn count_recommendations(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM recommendation_log", [])
    }
}

fn row_to_recommendation(row: &Row) -> rusqlite::Result<RecommendationRecord> {
    let action_str: String = row.get("action")?;
    let priority_str: String = row.get("priority")?;
    let timestamp_str: String = row.get("timestamp")?;

    let action = Action::from_str(&action_str).unwrap_or_else(|| {
        warn!(action = %action_str, "Unknown action in database, defaulting to Monitor");
        Action::Monitor
    });
    let priority = Priority::from_str(&priority_str).unwrap_or_else(|| {
        warn!(priority = %priority_str, "Unknown priority in database, defaulting to Low");
        Priority::Low
    });

    let amount: Option<f64> = row.get("amount")?;
    let duration: Option<u32> = row.get("duration_minutes")?;
    let recommended_time: Option<String> = row.get("recommended_time")?;
    let plan = match (amount, duration) {
        (Some(amount), Some(duration)) => Some(IrrigationPlan {
            amount,
            duration,
            recommended_time: recommended_time.unwrap_or_default(),
            hours_until_next: row.get("hours_until_next")?,
        }),
        _ => None,
    };

    let mut recommendation = Recommendation::new(action, priority, row.get::<_, String>("reason")?);
    recommendation.plan = plan;

    Ok(RecommendationRecord {
        id: Some(row.get("id")?),
        timestamp: parse_timestamp(&timestamp_str)?,
        crop_type: row.get("crop_type")?,
        recommendation,
    })
}

trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
