use super::analytics;
use super::engine::{FieldSnapshot, IntelligenceEngine};
use super::weather::WeatherEnricher;
use crate::config::Config;
use crate::datasources::OpenWeatherMapClient;
use crate::db::Database;
use crate::error::{AgriError, Result};
use crate::models::{
    AnalyticsSummary, CropDetail, CropProfile, CropSummary, CurrentWeather, FieldStatus,
    HealthReport, RecommendationRecord, StatusReport, TelemetrySample,
};
use chrono::{DateTime, Duration, Utc};

/// Ties storage, the weather provider and the engine together for each
/// report the CLI prints.
pub struct StatusService {
    config: Config,
    db: Database,
    engine: IntelligenceEngine,
    weather_client: Option<OpenWeatherMapClient>,
}

impl StatusService {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let engine = IntelligenceEngine::new(config.engine.clone())?;

        let weather_client = config.weather().map(|c| {
            tracing::info!("OpenWeatherMap client configured for current conditions");
            OpenWeatherMapClient::new(c.clone())
        });
        if weather_client.is_none() {
            tracing::info!("OpenWeatherMap not configured - using embedded sample weather");
        }

        Ok(Self {
            config,
            db,
            engine,
            weather_client,
        })
    }

    /// Stored profile for the crop, `None` when there is none.
    pub fn profile_for(&self, crop_type: &str) -> Result<Option<CropProfile>> {
        match self.db.get_crop_profile(crop_type) {
            Ok(profile) => Ok(Some(profile)),
            Err(AgriError::ConfigurationMissing(reason)) => {
                tracing::warn!(
                    crop_type = %crop_type,
                    default_profile = %self.engine.default_profile().name,
                    "{}, applying default profile",
                    reason
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Current conditions, or `None` on error, timeout or no provider.
    pub async fn current_weather(&self) -> Option<CurrentWeather> {
        let client = self.weather_client.as_ref()?;

        match tokio::time::timeout(client.timeout(), client.fetch_current()).await {
            Ok(Ok(weather)) => Some(weather),
            Ok(Err(e)) => {
                tracing::warn!("Failed to fetch current weather: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = client.timeout().as_secs(),
                    "Weather fetch timed out, using embedded sample weather"
                );
                None
            }
        }
    }

    /// Assesses the most recent sample and logs the recommendation.
    pub async fn status(&self) -> Result<StatusReport> {
        let latest = self.db.latest_sample()?.ok_or_else(|| {
            AgriError::NoData(
                "no telemetry stored; load samples with `agrisense import <file>`".into(),
            )
        })?;
        let crop_type = latest.crop_type.clone();

        let history = self
            .db
            .recent_samples_for_crop(&crop_type, self.config.storage.history_limit)?;
        let weather = self.current_weather().await;
        let enriched = WeatherEnricher::enrich(&latest, weather.as_ref());
        let stored = self.profile_for(&crop_type)?;
        let issued = self.issued_before(&latest, &history)?;

        let assessment = self.engine.assess(
            FieldSnapshot::new(&enriched)
                .with_history(&history)
                .with_profile(stored.as_ref())
                .with_issued(&issued),
        )?;

        self.db.log_recommendation(&RecommendationRecord::new(
            latest.timestamp,
            crop_type.as_str(),
            assessment.recommendation.clone(),
        ))?;

        let mut alerts = assessment.alerts;
        alerts.extend(self.db.active_alerts(self.config.storage.active_alert_limit)?);

        Ok(StatusReport {
            sensor_data: enriched,
            recommendation: assessment.recommendation,
            alerts,
            crop: assessment.profile,
            yield_health: assessment.yield_health,
            water_savings: assessment.water_savings,
            weather,
        })
    }

    /// Log entries that can explain the window, excluding any earlier
    /// evaluation of the latest sample itself.
    fn issued_before(
        &self,
        latest: &TelemetrySample,
        history: &[TelemetrySample],
    ) -> Result<Vec<RecommendationRecord>> {
        let earliest = history
            .iter()
            .map(|s| s.timestamp)
            .min()
            .unwrap_or(latest.timestamp)
            .min(latest.timestamp);
        let grace = Duration::minutes(self.config.engine.anomaly.leak_grace_minutes.max(0));

        let mut issued = self
            .db
            .recommendations_since(&latest.crop_type, earliest - grace)?;
        issued.retain(|r| r.timestamp < latest.timestamp);
        Ok(issued)
    }

    /// Chronological samples from the last `hours`, at most `limit` of the newest.
    pub fn history(
        &self,
        now: DateTime<Utc>,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<TelemetrySample>> {
        let cutoff = window_start(now, Duration::try_hours(i64::from(hours)), || {
            format!("history window of {} hours", hours)
        })?;
        let mut samples = self.db.samples_since(cutoff, Some(limit))?;
        samples.reverse();
        Ok(samples)
    }

    pub fn analytics(&self, now: DateTime<Utc>, days: u32) -> Result<AnalyticsSummary> {
        let cutoff = window_start(now, Duration::try_days(i64::from(days)), || {
            format!("analytics window of {} days", days)
        })?;
        let mut samples = self.db.samples_since(cutoff, None)?;
        samples.reverse();

        let Some(latest) = samples.last() else {
            return Ok(AnalyticsSummary::default());
        };

        let stored = self.profile_for(&latest.crop_type)?;
        let band = self
            .engine
            .resolve_profile(stored.as_ref())
            .ideal_moisture_range;
        let anomalies = self.db.count_alerts_since(cutoff)?;

        Ok(analytics::summarize(&samples, band, anomalies as usize))
    }

    /// One field per crop type, each assessed independently.
    pub fn fields(&self) -> Result<Vec<FieldStatus>> {
        let mut fields = Vec::new();

        for latest in self.db.latest_samples_by_crop()? {
            let history = self
                .db
                .recent_samples_for_crop(&latest.crop_type, self.config.storage.history_limit)?;
            let stored = self.profile_for(&latest.crop_type)?;
            let issued = self.issued_before(&latest, &history)?;

            let snapshot = FieldSnapshot::new(&latest)
                .with_history(&history)
                .with_profile(stored.as_ref())
                .with_issued(&issued);
            let assessment = match self.engine.assess(snapshot) {
                Ok(a) => a,
                Err(AgriError::InvalidInput(reason)) => {
                    tracing::warn!(crop_type = %latest.crop_type, "Skipping field: {}", reason);
                    continue;
                }
                Err(e) => return Err(e),
            };

            fields.push(FieldStatus {
                field_id: latest.crop_type.clone(),
                field_name: format!("Field {}", latest.crop_type),
                crop: latest.crop_type.clone(),
                moisture: latest.moisture()?,
                temperature: latest.weather.temperature,
                status: assessment.recommendation.priority,
                recommendation: assessment.recommendation,
                yield_health: assessment.yield_health,
            });
        }

        Ok(fields)
    }

    pub fn crops(&self) -> Result<Vec<CropSummary>> {
        self.db
            .crop_types()?
            .into_iter()
            .map(|crop_type| -> Result<CropSummary> {
                let latest = self.db.latest_sample_for_crop(&crop_type)?;
                Ok(CropSummary {
                    crop: self.stored_profile(&crop_type)?,
                    record_count: self.db.count_samples_for_crop(&crop_type)?,
                    last_update: latest.as_ref().map(|s| s.timestamp),
                    latest_data: latest,
                    crop_type,
                })
            })
            .collect()
    }

    pub fn crop_detail(
        &self,
        crop_type: &str,
        now: DateTime<Utc>,
        hours: u32,
        limit: usize,
    ) -> Result<CropDetail> {
        if crop_type.trim().is_empty() {
            return Err(AgriError::InvalidInput("crop type is required".into()));
        }

        let cutoff = window_start(now, Duration::try_hours(i64::from(hours)), || {
            format!("crop window of {} hours", hours)
        })?;
        let mut data = self.db.crop_samples_since(crop_type, cutoff, Some(limit))?;
        data.reverse();

        Ok(CropDetail {
            crop_type: crop_type.to_string(),
            crop: self.stored_profile(crop_type)?,
            stats: analytics::crop_stats(&data),
            data,
        })
    }

    pub fn recommendations(&self, limit: usize) -> Result<Vec<RecommendationRecord>> {
        self.db.recent_recommendations(limit)
    }

    pub async fn check(&self) -> Result<HealthReport> {
        let weather = match self.weather_client {
            Some(ref client) => Some(client.test_connection().await.unwrap_or(false)),
            None => None,
        };

        Ok(HealthReport {
            status: "ok".to_string(),
            database: self.db.path().display().to_string(),
            crops: self.db.count_crop_profiles()?,
            sensor_data: self.db.count_samples()?,
            alerts: self.db.count_alerts()?,
            recommendations: self.db.count_recommendations()?,
            weather,
        })
    }

    // Summaries report only what is stored, without the default fallback.
    fn stored_profile(&self, crop_type: &str) -> Result<Option<CropProfile>> {
        match self.db.get_crop_profile(crop_type) {
            Ok(profile) => Ok(Some(profile)),
            Err(AgriError::ConfigurationMissing(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// `now` minus the window span, rejecting spans outside chrono's range.
fn window_start<F>(
    now: DateTime<Utc>,
    span: Option<Duration>,
    describe: F,
) -> Result<DateTime<Utc>>
where
    F: FnOnce() -> String,
{
    span.and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| AgriError::InvalidInput(format!("{} is out of range", describe())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenWeatherMapConfig;
    use crate::models::{Action, Alert, AlertKind, AlertSource, Priority};
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn sample(minutes: i64, crop: &str, moisture: f64) -> TelemetrySample {
        TelemetrySample::new(at(minutes), crop)
            .with_moisture(moisture)
            .with_weather(22.0 + minutes as f64 / 100.0, 60.0)
    }

    fn service(db: &Database) -> StatusService {
        StatusService::new(Config::default(), db.clone()).unwrap()
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_crop_profile(&CropProfile::new("Wheat", 30.0, 60.0))
            .unwrap();
        db.insert_samples(&[
            sample(0, "Wheat", 20.0),
            sample(30, "Wheat", 20.0),
            sample(60, "Wheat", 20.0),
            sample(90, "Wheat", 20.0),
            sample(120, "Wheat", 60.0),
            sample(10, "Rice", 70.0),
            sample(40, "Rice", 72.0),
        ])
        .unwrap();
        db
    }

    #[tokio::test]
    async fn empty_store_is_no_data() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            service(&db).status().await,
            Err(AgriError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn status_assesses_latest_sample_and_logs_it() {
        let db = seeded();
        db.insert_alert(&Alert::detected(
            AlertKind::Manual,
            Priority::Low,
            100,
            "Valve replaced",
            at(5),
        ))
        .unwrap();

        let report = service(&db).status().await.unwrap();
        assert_eq!(report.sensor_data.timestamp, at(120));
        assert_eq!(report.recommendation.action, Action::Monitor);
        assert!(report
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::LeakSuspected && a.source == AlertSource::Detected));
        assert_eq!(
            report.alerts.last().map(|a| a.source),
            Some(AlertSource::Logged)
        );
        assert!(report.weather.is_none());

        let logged = db.recent_recommendations(5).unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].timestamp, at(120));

        // Re-running over the same sample replaces the log entry
        let again = service(&db).status().await.unwrap();
        assert_eq!(again.alerts.len(), report.alerts.len());
        assert_eq!(db.count_recommendations().unwrap(), 1);
    }

    #[tokio::test]
    async fn logged_irrigation_suppresses_leak() {
        let db = seeded();
        db.log_recommendation(&RecommendationRecord::new(
            at(90),
            "Wheat",
            crate::models::Recommendation::new(Action::Irrigate, Priority::High, "dry"),
        ))
        .unwrap();

        let report = service(&db).status().await.unwrap();
        assert!(!report
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::LeakSuspected));
    }

    #[tokio::test]
    async fn unknown_crop_falls_back_to_default_profile() {
        let db = Database::open_in_memory().unwrap();
        db.insert_sample(&sample(0, "Sorghum", 25.0)).unwrap();

        let report = service(&db).status().await.unwrap();
        assert_eq!(report.crop, CropProfile::default());
        assert_eq!(report.recommendation.action, Action::Irrigate);
    }

    #[tokio::test]
    async fn unreachable_weather_provider_degrades() {
        let db = seeded();
        let client = OpenWeatherMapClient::with_base_url(
            OpenWeatherMapConfig {
                api_key: "k".into(),
                latitude: 0.0,
                longitude: 0.0,
                enabled: true,
                timeout_secs: 1,
            },
            "http://127.0.0.1:9",
        );
        let mut svc = service(&db);
        svc.weather_client = Some(client);
        let report = svc.status().await.unwrap();
        assert!(report.weather.is_none());
        assert_eq!(report.sensor_data.weather.humidity, Some(60.0));
    }

    #[test]
    fn history_is_chronological_and_bounded() {
        let db = seeded();
        let svc = service(&db);
        let all = svc.history(at(120), 24, 100).unwrap();
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let newest = svc.history(at(120), 24, 2).unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[1].timestamp, at(120));

        let recent = svc.history(at(120) + Duration::hours(1), 1, 100).unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn analytics_over_window() {
        let db = seeded();
        let summary = service(&db).analytics(at(120), 7).unwrap();
        assert_eq!(summary.data_points, 7);
        // 20 -> 70 (Rice interleaved) and 20 -> 60 are rises over 5pp
        assert!(summary.irrigation_events >= 1);
        assert!((0.0..=100.0).contains(&summary.efficiency));

        let empty = service(&db).analytics(at(120) + Duration::days(30), 7).unwrap();
        assert_eq!(empty, AnalyticsSummary::default());
    }

    #[test]
    fn oversized_windows_are_invalid_input() {
        let db = seeded();
        let svc = service(&db);
        let now = at(120);

        assert!(matches!(
            svc.history(now, u32::MAX, 10),
            Err(AgriError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.analytics(now, 100_000_000),
            Err(AgriError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.analytics(now, u32::MAX),
            Err(AgriError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.crop_detail("Wheat", now, u32::MAX, 10),
            Err(AgriError::InvalidInput(_))
        ));

        // Large but representable windows still cover everything
        assert_eq!(svc.history(now, 24 * 365 * 100, 100).unwrap().len(), 7);
    }

    #[test]
    fn fields_cover_every_crop() {
        let db = seeded();
        let fields = service(&db).fields().unwrap();
        assert_eq!(fields.len(), 2);

        let rice = fields.iter().find(|f| f.field_id == "Rice").unwrap();
        assert_eq!(rice.field_name, "Field Rice");
        assert_eq!(rice.moisture, 72.0);
        // No Rice profile stored, default band 30-60 applies
        assert_eq!(rice.recommendation.action, Action::Stop);
        assert_eq!(rice.status, rice.recommendation.priority);
    }

    #[test]
    fn crop_summaries_and_detail() {
        let db = seeded();
        let svc = service(&db);

        let crops = svc.crops().unwrap();
        assert_eq!(crops.len(), 2);
        assert_eq!(crops[0].crop_type, "Rice");
        assert!(crops[0].crop.is_none());
        assert_eq!(crops[1].record_count, 5);
        assert_eq!(crops[1].last_update, Some(at(120)));

        let detail = svc.crop_detail("Wheat", at(120), 24, 100).unwrap();
        assert_eq!(detail.stats.total_records, 5);
        assert_eq!(detail.stats.avg_moisture, 28.0);
        assert_eq!(detail.data.first().map(|s| s.timestamp), Some(at(0)));
        assert!(detail.crop.is_some());

        let none = svc.crop_detail("Barley", at(120), 24, 100).unwrap();
        assert!(none.data.is_empty());
        assert_eq!(none.stats.avg_moisture, 0.0);
        assert!(svc.crop_detail(" ", at(120), 24, 100).is_err());
    }

    #[tokio::test]
    async fn check_reports_counts() {
        let db = seeded();
        let report = service(&db).check().await.unwrap();
        assert_eq!(report.status, "ok");
        assert_eq!(report.sensor_data, 7);
        assert_eq!(report.crops, 1);
        assert!(report.weather.is_none());
    }
}
