use crate::error::{AgriError, Result};
use crate::models::{Band, CropProfile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DATABASE_URL_ENV: &str = "AGRISENSE_DATABASE_URL";

// Recommendation thresholds (percentage points unless noted)
pub const DEFAULT_STOP_CRITICAL_EXCESS: f64 = 15.0;
pub const DEFAULT_STOP_HIGH_EXCESS: f64 = 5.0;
pub const DEFAULT_IRRIGATE_CRITICAL_DEFICIT: f64 = 15.0;
pub const DEFAULT_IRRIGATE_HIGH_DEFICIT: f64 = 8.0;
pub const DEFAULT_LITRES_PER_POINT: f64 = 1.2;
pub const DEFAULT_MIN_AMOUNT: f64 = 2.0;
pub const DEFAULT_MAX_AMOUNT: f64 = 40.0;
pub const DEFAULT_MIN_DURATION_MINUTES: u32 = 5;
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 120;
pub const DEFAULT_BASE_INTERVAL_HOURS: f64 = 24.0;
pub const DEFAULT_TREND_WINDOW: usize = 3;
pub const DEFAULT_TREND_DROP_THRESHOLD: f64 = 2.0;
pub const DEFAULT_NEAR_LOWER_MARGIN: f64 = 5.0;
pub const DEFAULT_HOT_TEMPERATURE_C: f64 = 30.0;
pub const DEFAULT_WARM_TEMPERATURE_C: f64 = 25.0;
pub const DEFAULT_DRY_HUMIDITY: f64 = 40.0;

// Anomaly thresholds
pub const DEFAULT_STRESS_MARGIN: f64 = 5.0;
pub const DEFAULT_SUSTAIN_SAMPLES: usize = 3;
pub const DEFAULT_LEAK_JUMP: f64 = 10.0;
pub const DEFAULT_LEAK_GRACE_MINUTES: i64 = 60;
pub const MAX_LEAK_GRACE_MINUTES: i64 = 7 * 24 * 60;
pub const DEFAULT_DROPOUT_RUN: usize = 6;
pub const DEFAULT_CONFIDENCE_SLOPE: f64 = 3.0;

// Water savings
pub const DEFAULT_FIXED_DOSE_PER_INTERVAL: f64 = 1.0;

// Yield health
pub const DEFAULT_MOISTURE_WEIGHT: f64 = 0.5;
pub const DEFAULT_NUTRIENT_WEIGHT: f64 = 0.3;
pub const DEFAULT_WEATHER_WEIGHT: f64 = 0.2;
pub const DEFAULT_MOISTURE_DECAY_SPAN: f64 = 20.0;
pub const DEFAULT_TEMPERATURE_DECAY_SPAN: f64 = 15.0;
pub const DEFAULT_HUMIDITY_DECAY_SPAN: f64 = 30.0;

// Storage
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_ACTIVE_ALERT_LIMIT: usize = 5;

// Weather
pub const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub openweathermap: Option<OpenWeatherMapConfig>,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: Option<String>,
    /// Samples fetched for the status window.
    pub history_limit: usize,
    /// Persisted active alerts merged into the status feed.
    pub active_alert_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            active_alert_limit: DEFAULT_ACTIVE_ALERT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Memory,
    File(PathBuf),
}

impl StorageConfig {
    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AgriError::Config(format!(
                    "database URL missing - set {} or storage.database_url",
                    DATABASE_URL_ENV
                ))
            })
    }

    /// Accepts `sqlite://path`, `sqlite::memory:`, `:memory:` or a bare path.
    pub fn location(&self) -> Result<StorageLocation> {
        let url = self.database_url()?.trim();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        match path {
            ":memory:" | "" => Ok(StorageLocation::Memory),
            p => Ok(StorageLocation::File(PathBuf::from(p))),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OpenWeatherMapConfig {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_WEATHER_TIMEOUT_SECS
}

impl std::fmt::Debug for OpenWeatherMapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapConfig")
            .field("api_key", &"[REDACTED]")
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("enabled", &self.enabled)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Tunables for every engine component. Plain data with defaults, so the
/// engine can be built in tests without touching the environment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Applied when a crop type has no stored profile.
    pub default_profile: CropProfile,
    pub recommendation: RecommendationConfig,
    pub anomaly: AnomalyConfig,
    pub water_savings: WaterSavingsConfig,
    pub yield_health: YieldHealthConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub stop_critical_excess: f64,
    pub stop_high_excess: f64,
    pub irrigate_critical_deficit: f64,
    pub irrigate_high_deficit: f64,
    /// L/m² per percentage point of deficit on loam.
    pub litres_per_point: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
    pub base_interval_hours: f64,
    /// Samples per half of the trend comparison.
    pub trend_window: usize,
    pub trend_drop_threshold: f64,
    pub near_lower_margin: f64,
    pub hot_temperature: f64,
    pub warm_temperature: f64,
    pub dry_humidity: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            stop_critical_excess: DEFAULT_STOP_CRITICAL_EXCESS,
            stop_high_excess: DEFAULT_STOP_HIGH_EXCESS,
            irrigate_critical_deficit: DEFAULT_IRRIGATE_CRITICAL_DEFICIT,
            irrigate_high_deficit: DEFAULT_IRRIGATE_HIGH_DEFICIT,
            litres_per_point: DEFAULT_LITRES_PER_POINT,
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            base_interval_hours: DEFAULT_BASE_INTERVAL_HOURS,
            trend_window: DEFAULT_TREND_WINDOW,
            trend_drop_threshold: DEFAULT_TREND_DROP_THRESHOLD,
            near_lower_margin: DEFAULT_NEAR_LOWER_MARGIN,
            hot_temperature: DEFAULT_HOT_TEMPERATURE_C,
            warm_temperature: DEFAULT_WARM_TEMPERATURE_C,
            dry_humidity: DEFAULT_DRY_HUMIDITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Distance beyond the ideal band before stress is flagged.
    pub stress_margin: f64,
    /// Consecutive samples required for DryStress / OverIrrigation.
    pub sustain_samples: usize,
    /// Rise between consecutive samples treated as an uncontrolled water event.
    pub leak_jump: f64,
    /// How far before a rise an Irrigate recommendation still explains it.
    pub leak_grace_minutes: i64,
    /// Identical consecutive readings tolerated before flagging a dropout.
    pub dropout_run: usize,
    /// Confidence points gained per unit past a threshold.
    pub confidence_slope: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            stress_margin: DEFAULT_STRESS_MARGIN,
            sustain_samples: DEFAULT_SUSTAIN_SAMPLES,
            leak_jump: DEFAULT_LEAK_JUMP,
            leak_grace_minutes: DEFAULT_LEAK_GRACE_MINUTES,
            dropout_run: DEFAULT_DROPOUT_RUN,
            confidence_slope: DEFAULT_CONFIDENCE_SLOPE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WaterSavingsConfig {
    /// L/m² a calendar schedule applies every sampling interval.
    pub fixed_dose_per_interval: f64,
}

impl Default for WaterSavingsConfig {
    fn default() -> Self {
        Self {
            fixed_dose_per_interval: DEFAULT_FIXED_DOSE_PER_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct YieldHealthConfig {
    pub moisture_weight: f64,
    pub nutrient_weight: f64,
    pub weather_weight: f64,
    /// Points outside the band at which the moisture sub-score reaches 0.
    pub moisture_decay_span: f64,
    pub comfort_temperature: Band,
    pub temperature_decay_span: f64,
    pub comfort_humidity: Band,
    pub humidity_decay_span: f64,
}

impl Default for YieldHealthConfig {
    fn default() -> Self {
        Self {
            moisture_weight: DEFAULT_MOISTURE_WEIGHT,
            nutrient_weight: DEFAULT_NUTRIENT_WEIGHT,
            weather_weight: DEFAULT_WEATHER_WEIGHT,
            moisture_decay_span: DEFAULT_MOISTURE_DECAY_SPAN,
            comfort_temperature: Band::new(15.0, 30.0),
            temperature_decay_span: DEFAULT_TEMPERATURE_DECAY_SPAN,
            comfort_humidity: Band::new(40.0, 80.0),
            humidity_decay_span: DEFAULT_HUMIDITY_DECAY_SPAN,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.default_profile
            .validate()
            .map_err(|e| AgriError::Config(format!("engine.default_profile: {}", e)))?;

        let rec = &self.recommendation;
        if rec.min_amount <= 0.0 || rec.min_amount > rec.max_amount {
            return Err(AgriError::Config(format!(
                "engine.recommendation: amount bounds {}-{} are invalid",
                rec.min_amount, rec.max_amount
            )));
        }
        if rec.min_duration_minutes == 0 || rec.min_duration_minutes > rec.max_duration_minutes {
            return Err(AgriError::Config(format!(
                "engine.recommendation: duration bounds {}-{} are invalid",
                rec.min_duration_minutes, rec.max_duration_minutes
            )));
        }
        if rec.litres_per_point <= 0.0 || rec.trend_window == 0 {
            return Err(AgriError::Config(
                "engine.recommendation: litres_per_point and trend_window must be positive".into(),
            ));
        }

        let anomaly = &self.anomaly;
        if anomaly.sustain_samples == 0 || anomaly.dropout_run == 0 || anomaly.leak_jump <= 0.0 {
            return Err(AgriError::Config(
                "engine.anomaly: sustain_samples, dropout_run and leak_jump must be positive"
                    .into(),
            ));
        }

        if !(0..=MAX_LEAK_GRACE_MINUTES).contains(&anomaly.leak_grace_minutes) {
            return Err(AgriError::Config(format!(
                "engine.anomaly: leak_grace_minutes must be within 0-{}",
                MAX_LEAK_GRACE_MINUTES
            )));
        }

        if self.water_savings.fixed_dose_per_interval < 0.0 {
            return Err(AgriError::Config(
                "engine.water_savings: fixed_dose_per_interval cannot be negative".into(),
            ));
        }

        let yh = &self.yield_health;
        let weights = [yh.moisture_weight, yh.nutrient_weight, yh.weather_weight];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(AgriError::Config(
                "engine.yield_health: weights must be non-negative with a positive sum".into(),
            ));
        }
        if yh.moisture_decay_span <= 0.0
            || yh.temperature_decay_span <= 0.0
            || yh.humidity_decay_span <= 0.0
        {
            return Err(AgriError::Config(
                "engine.yield_health: decay spans must be positive".into(),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Loads YAML config from the override path or a standard location, then
    /// applies the database URL from the environment. A missing file yields
    /// defaults; the database URL is checked by the caller.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => {
                if !p.exists() {
                    return Err(AgriError::Config(format!(
                        "Config file not found at {:?}",
                        p
                    )));
                }
                Some(p)
            }
            None => Self::find_config_path(),
        };

        let mut config = match config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                let config_str = std::fs::read_to_string(&path)
                    .map_err(|e| AgriError::Config(format!("Failed to read config: {}", e)))?;
                Self::from_yaml(&config_str)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        };

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.storage.database_url = Some(url);
            }
        }

        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content)?;
        serde_yaml::from_str(&content)
            .map_err(|e| AgriError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Search for config.yaml in standard locations.
    fn find_config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("agrisense").join("config.yaml"))
            .filter(|p| p.exists())
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut result = content.to_string();

        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| AgriError::Config(format!("Invalid substitution pattern: {}", e)))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        Ok(result)
    }

    pub fn weather(&self) -> Option<&OpenWeatherMapConfig> {
        self.openweathermap
            .as_ref()
            .filter(|c| c.enabled && !c.api_key.is_empty())
    }
}
