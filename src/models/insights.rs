use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterSavings {
    /// L/m² saved against the fixed schedule, never negative.
    pub saved: f64,
    /// 0-100
    pub percentage: f64,
    pub fixed_total: f64,
    pub actual_total: f64,
}

/// Composite crop-health score, 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YieldHealth(u8);

impl YieldHealth {
    pub const MAX: YieldHealth = YieldHealth(100);

    /// Rounds and clamps a raw score into 0-100.
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_nan() {
            return YieldHealth(0);
        }
        YieldHealth(raw.round().clamp(0.0, 100.0) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for YieldHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
