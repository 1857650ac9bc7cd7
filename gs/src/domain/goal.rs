//! Goal-side inputs: the goal itself, splitting options, postprocessing context

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Difficulty, Tempo};

/// A user-authored goal, as seen by the habit suggester
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Goal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Optional hints for decomposing a goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SplitOptions {
    /// Where the user starts from ("run 2 km", "A1 level")
    pub baseline: Option<String>,

    /// Unit the goal is measured in
    pub unit: Option<String>,

    /// How often the user can work on it
    pub frequency: Option<String>,

    /// Free-text constraints (time, budget, equipment)
    pub constraints: Option<String>,

    pub target_date: Option<NaiveDate>,

    /// Treat the goal as urgent regardless of text and date
    pub force_daily: bool,

    pub tempo: Tempo,
}

/// Context used by the contextualize and prioritize postprocessing stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalContext {
    pub goal: String,
    pub tags: Vec<String>,
    pub deadline: Option<NaiveDate>,
    pub preferred_difficulty: Option<Difficulty>,
    pub history_summary: Option<String>,
    pub related_goals: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_options_deserialize_camel_case() {
        let json = r#"{"targetDate": "2026-11-01", "forceDaily": true, "tempo": "aggressive"}"#;
        let opts: SplitOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.target_date, NaiveDate::from_ymd_opt(2026, 11, 1));
        assert!(opts.force_daily);
        assert_eq!(opts.tempo, Tempo::Aggressive);
        assert!(opts.baseline.is_none());
    }

    #[test]
    fn test_goal_context_defaults() {
        let ctx: GoalContext = serde_json::from_str(r#"{"tags": ["python"]}"#).unwrap();
        assert_eq!(ctx.tags, vec!["python"]);
        assert!(ctx.deadline.is_none());
        assert!(ctx.preferred_difficulty.is_none());
        assert!(ctx.related_goals.is_empty());
    }
}
