use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Irrigate,
    Delay,
    Stop,
    Monitor,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Irrigate => "Irrigate",
            Action::Delay => "Delay",
            Action::Stop => "Stop",
            Action::Monitor => "Monitor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "irrigate" => Some(Action::Irrigate),
            "delay" => Some(Action::Delay),
            "stop" => Some(Action::Stop),
            "monitor" => Some(Action::Monitor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Urgency scale shared by recommendations (priority) and alerts (severity).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }

    /// One step up the scale, saturating at Critical.
    pub fn escalate(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Critical => Priority::Critical,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrrigationPlan {
    /// L/m²
    pub amount: f64,
    /// Minutes
    pub duration: u32,
    pub recommended_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_until_next: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub priority: Priority,
    pub reason: String,
    #[serde(flatten)]
    pub plan: Option<IrrigationPlan>,
}

impl Recommendation {
    pub fn new(action: Action, priority: Priority, reason: impl Into<String>) -> Self {
        Self {
            action,
            priority,
            reason: reason.into(),
            plan: None,
        }
    }

    pub fn with_plan(mut self, plan: IrrigationPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn is_irrigate(&self) -> bool {
        self.action == Action::Irrigate
    }

    /// Water applied by this recommendation, 0 unless irrigating.
    pub fn applied_amount(&self) -> f64 {
        match (&self.action, &self.plan) {
            (Action::Irrigate, Some(plan)) => plan.amount,
            _ => 0.0,
        }
    }
}

/// A recommendation as it was issued for a crop at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub crop_type: String,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

impl RecommendationRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        crop_type: impl Into<String>,
        recommendation: Recommendation,
    ) -> Self {
        Self {
            id: None,
            timestamp,
            crop_type: crop_type.into(),
            recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_totally_ordered() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::High.escalate(), Priority::Critical);
        assert_eq!(Priority::Critical.escalate(), Priority::Critical);
    }

    #[test]
    fn priority_and_action_from_str() {
        assert_eq!(Priority::from_str("critical"), Some(Priority::Critical));
        assert_eq!(Priority::from_str("urgent"), None);
        assert_eq!(Action::from_str("Irrigate"), Some(Action::Irrigate));
        assert_eq!(Action::from_str("water"), None);
    }

    #[test]
    fn irrigate_serializes_flat_plan() {
        let rec = Recommendation::new(Action::Irrigate, Priority::High, "dry").with_plan(
            IrrigationPlan {
                amount: 12.5,
                duration: 21,
                recommended_time: "Early morning (05:00-08:00)".into(),
                hours_until_next: Some(24),
            },
        );
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["action"], "Irrigate");
        assert_eq!(value["priority"], "High");
        assert_eq!(value["amount"], 12.5);
        assert_eq!(value["duration"], 21);
        assert_eq!(value["hoursUntilNext"], 24);
        assert_eq!(rec.applied_amount(), 12.5);
    }

    #[test]
    fn monitor_has_no_plan_fields() {
        let rec = Recommendation::new(Action::Monitor, Priority::Low, "in band");
        let value = serde_json::to_value(&rec).unwrap();
        assert!(value.get("amount").is_none());
        assert!(value.get("recommendedTime").is_none());
        assert_eq!(rec.applied_amount(), 0.0);
    }
}
