use crate::error::{AgriError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const DEFAULT_MOISTURE_MIN: f64 = 30.0;
pub const DEFAULT_MOISTURE_MAX: f64 = 60.0;

/// Inclusive `[min, max]` band. A band with only a floor has an infinite `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub max: f64,
}

fn unbounded() -> f64 {
    f64::INFINITY
}

fn is_unbounded(max: &f64) -> bool {
    max.is_infinite()
}

impl Band {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(min, unbounded())
    }

    pub fn is_open(&self) -> bool {
        is_unbounded(&self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Distance from the nearest edge, 0 inside the band.
    pub fn distance(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_open() {
            write!(f, "{}+", Edge(self.min))
        } else {
            write!(f, "{}-{}", Edge(self.min), Edge(self.max))
        }
    }
}

/// Whole numbers print bare, anything else keeps one decimal.
struct Edge(f64);

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{:.1}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTargets {
    #[serde(default)]
    pub nitrogen: Option<Band>,
    #[serde(default)]
    pub phosphorus: Option<Band>,
    #[serde(default)]
    pub potassium: Option<Band>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 3] = [Nutrient::Nitrogen, Nutrient::Phosphorus, Nutrient::Potassium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "Nitrogen",
            Nutrient::Phosphorus => "Phosphorus",
            Nutrient::Potassium => "Potassium",
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl NutrientTargets {
    pub fn band(&self, nutrient: Nutrient) -> Option<Band> {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nitrogen.is_none() && self.phosphorus.is_none() && self.potassium.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropProfile {
    pub name: String,
    pub ideal_moisture_range: Band,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrient_targets: Option<NutrientTargets>,
}

impl CropProfile {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            ideal_moisture_range: Band::new(min, max),
            nutrient_targets: None,
        }
    }

    pub fn with_nutrient_targets(mut self, targets: NutrientTargets) -> Self {
        self.nutrient_targets = Some(targets);
        self
    }

    pub fn nutrient_band(&self, nutrient: Nutrient) -> Option<Band> {
        self.nutrient_targets.and_then(|t| t.band(nutrient))
    }

    /// Ideal band must be ordered and lie within 0-100.
    pub fn validate(&self) -> Result<()> {
        let Band { min, max } = self.ideal_moisture_range;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(AgriError::InvalidInput(format!(
                "crop profile '{}' has an invalid moisture band {}-{}",
                self.name, min, max
            )));
        }
        if min < 0.0 || max > 100.0 {
            return Err(AgriError::InvalidInput(format!(
                "crop profile '{}' moisture band {}-{} lies outside 0-100",
                self.name, min, max
            )));
        }
        Ok(())
    }
}

impl Default for CropProfile {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE_NAME, DEFAULT_MOISTURE_MIN, DEFAULT_MOISTURE_MAX)
    }
}
