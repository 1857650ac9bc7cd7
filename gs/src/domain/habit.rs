//! Habit suggestions produced for a goal

use serde::{Deserialize, Serialize};

use super::Difficulty;

/// Confidence assigned when a provider does not state one
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// How often a habit is practiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Lifecycle state of a habit; suggestions always start as `Suggested`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    #[default]
    Suggested,
    Active,
    Rejected,
}

/// Who authored the habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitSource {
    #[default]
    Ai,
    User,
}

/// A habit proposed for a goal, for the user to accept or reject individually
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitSuggestion {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub difficulty: Difficulty,
    pub confidence: f64,
    pub status: HabitStatus,
    pub source: HabitSource,
    pub linked_goal_id: String,
}

impl HabitSuggestion {
    pub fn new(title: impl Into<String>, linked_goal_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            frequency: Frequency::default(),
            difficulty: Difficulty::default(),
            confidence: DEFAULT_CONFIDENCE,
            status: HabitStatus::Suggested,
            source: HabitSource::Ai,
            linked_goal_id: linked_goal_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_suggestion_tags() {
        let habit = HabitSuggestion::new("Read 20 pages", "goal-1");
        let json = serde_json::to_value(&habit).unwrap();
        assert_eq!(json["status"], "suggested");
        assert_eq!(json["source"], "ai");
        assert_eq!(json["linkedGoalId"], "goal-1");
        assert_eq!(json["frequency"], "daily");
        assert_eq!(json["difficulty"], "medium");
        assert_eq!(json["confidence"], 0.7);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("hourly".parse::<Frequency>().is_err());
        assert_eq!(Frequency::Monthly.to_string(), "monthly");
    }
}
