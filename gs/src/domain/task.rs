//! Task - an atomic, checkable step towards a goal
//!
//! Tasks are ephemeral value objects: created per call, never persisted by
//! this crate. Callers own persistence and resetting `done`.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::Priority;

/// Longest title a generated task may carry
pub const MAX_GENERATED_TITLE_CHARS: usize = 120;

/// Time estimate: exactly one unit is carried, chosen by goal urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimate {
    #[serde(rename = "week_estimate")]
    Weeks(i64),
    #[serde(rename = "day_estimate")]
    Days(i64),
}

impl Estimate {
    /// Convert to the unit matching the urgency mode
    ///
    /// Days are `weeks * 7`; weeks are `ceil(days / 7)` with a floor of 1.
    pub fn for_urgency(self, urgent: bool) -> Self {
        match (self, urgent) {
            (Self::Weeks(w), true) => Self::Days(w.saturating_mul(7).clamp(1, 365)),
            (Self::Days(d), false) => Self::Weeks((d.saturating_add(6) / 7).clamp(1, 52)),
            (other, _) => other,
        }
    }
}

/// A single step of a decomposed goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub estimate: Option<Estimate>,

    #[serde(rename = "acceptanceCriteria", default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Task {
    /// Create a task with a fresh time-ordered id
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::now_v7().to_string(), title)
    }

    /// Create a task with a caller-chosen id (used by the deterministic generators)
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            estimate: None,
            acceptance_criteria: None,
            done: false,
            priority: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn estimate(mut self, estimate: Estimate) -> Self {
        self.estimate = Some(estimate);
        self
    }

    pub fn acceptance(mut self, criteria: impl Into<String>) -> Self {
        self.acceptance_criteria = Some(criteria.into());
        self
    }

    pub fn week_estimate(&self) -> Option<i64> {
        match self.estimate {
            Some(Estimate::Weeks(w)) => Some(w),
            _ => None,
        }
    }

    pub fn day_estimate(&self) -> Option<i64> {
        match self.estimate {
            Some(Estimate::Days(d)) => Some(d),
            _ => None,
        }
    }

    /// Rewrite the estimate into the unit matching the urgency mode
    ///
    /// A task without an estimate gets one week (or one day when urgent).
    pub fn apply_urgency(&mut self, urgent: bool) {
        let estimate = self.estimate.unwrap_or(Estimate::Weeks(1));
        self.estimate = Some(estimate.for_urgency(urgent));
    }

    /// Trim the title and fold anything past `max_chars` into the description
    pub fn clamp_title(&mut self, max_chars: usize) {
        let (title, overflow) = split_title(&self.title, max_chars);
        if let Some(rest) = overflow {
            debug!(id = %self.id, "clamp_title: folding title overflow into description");
            self.description = Some(match self.description.take() {
                Some(desc) if !desc.trim().is_empty() => format!("{}\n{}", rest, desc),
                _ => rest,
            });
        }
        self.title = title;
    }
}

/// Split text into a title of at most `max_chars` chars and the trimmed overflow
pub fn split_title(text: &str, max_chars: usize) -> (String, Option<String>) {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return (text.to_string(), None);
    }
    let title: String = text.chars().take(max_chars).collect();
    let rest: String = text.chars().skip(max_chars).collect();
    let rest = rest.trim();
    let overflow = if rest.is_empty() { None } else { Some(rest.to_string()) };
    (title.trim_end().to_string(), overflow)
}
