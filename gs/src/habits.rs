//! HabitSuggester - supporting habits for a goal
//!
//! One provider round-trip with a single prompt. The answer is read
//! defensively and every suggestion comes back tagged as an AI suggestion
//! linked to the goal; callers let the user accept or reject each one.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::{DEFAULT_CONFIDENCE, Difficulty, Frequency, Goal, HabitSuggestion};
use crate::parser::extract_json;
use crate::provider::{CallOptions, ProviderOrchestrator, RawPayload};

pub struct HabitSuggester {
    orchestrator: Arc<ProviderOrchestrator>,
    call_options: CallOptions,
    timeout: Duration,
}

impl HabitSuggester {
    /// `timeout` bounds each provider in the fallback chain
    pub fn new(orchestrator: Arc<ProviderOrchestrator>, timeout: Duration) -> Self {
        let call_options = orchestrator.defaults().clone().with_provider_timeout(timeout);
        let timeout = call_options.chain_budget().unwrap_or(timeout);
        Self {
            orchestrator,
            call_options,
            timeout,
        }
    }

    /// Suggest habits for `goal`, never returning an empty list
    ///
    /// `existing` holds titles of habits the user already has, so the
    /// provider can avoid repeating them.
    pub async fn suggest(&self, goal: &Goal, existing: &[String]) -> Vec<HabitSuggestion> {
        debug!(goal_id = %goal.id, existing = existing.len(), "suggest: called");
        let prompt = build_habit_prompt(goal, existing);

        let call = self.orchestrator.call_multi(&prompt, &self.call_options);
        let suggestions = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(result)) => {
                let suggestions = habits_from_payload(&result.result, &goal.id);
                info!(provider = %result.provider, count = suggestions.len(), "suggest: parsed suggestions");
                suggestions
            }
            Ok(Err(e)) => {
                warn!(error = %e, "suggest: providers failed");
                Vec::new()
            }
            Err(_) => {
                warn!("suggest: timed out");
                Vec::new()
            }
        };

        if suggestions.is_empty() {
            info!(goal_id = %goal.id, "suggest: using default suggestion");
            return vec![default_suggestion(goal)];
        }
        suggestions
    }
}

/// Render the habit prompt
pub fn build_habit_prompt(goal: &Goal, existing: &[String]) -> String {
    let description = goal
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("Описание: {}\n", d.trim()))
        .unwrap_or_default();
    let existing = if existing.is_empty() {
        String::new()
    } else {
        format!(
            "Уже есть привычки (не повторяй их): {}\n",
            existing.iter().map(|h| h.trim()).collect::<Vec<_>>().join("; ")
        )
    };

    format!(
        "Предложи 2-4 полезные привычки, которые помогут достичь цели.\n\
         Цель: {}\n{description}{existing}\
         Ответ только в JSON: {{\"habits\": [{{\"title\": \"...\", \"description\": \"...\", \
         \"frequency\": \"daily|weekly|monthly\", \"difficulty\": \"easy|medium|hard\", \"confidence\": 0.8}}]}}",
        goal.title.trim()
    )
}

/// Read suggestions from a provider payload; unusable entries are skipped
pub fn habits_from_payload(raw: &RawPayload, goal_id: &str) -> Vec<HabitSuggestion> {
    let value = match raw {
        RawPayload::Json(Value::String(text)) | RawPayload::Text(text) => extract_json(text),
        RawPayload::Json(value) => Some(value.clone()),
    };
    let Some(value) = value else {
        debug!("habits_from_payload: no JSON found");
        return Vec::new();
    };

    let entries = match &value {
        Value::Object(map) => map.get("habits").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    };

    entries
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|obj| habit_from_object(obj, goal_id))
                .collect()
        })
        .unwrap_or_default()
}

fn habit_from_object(obj: &Map<String, Value>, goal_id: &str) -> Option<HabitSuggestion> {
    let title = obj.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let mut habit = HabitSuggestion::new(title, goal_id);
    habit.description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    habit.frequency = obj
        .get("frequency")
        .and_then(Value::as_str)
        .and_then(|f| f.parse::<Frequency>().ok())
        .unwrap_or_default();
    habit.difficulty = obj
        .get("difficulty")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or_default();
    habit.confidence = obj
        .get("confidence")
        .and_then(|c| match c {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);
    Some(habit)
}

/// The single suggestion offered when no provider answered usefully
pub fn default_suggestion(goal: &Goal) -> HabitSuggestion {
    let title = goal.title.trim();
    let title = if title.is_empty() { "цель" } else { title };
    let mut habit = HabitSuggestion::new(format!("Каждый день уделять 15 минут цели «{}»", title), &goal.id);
    habit.description = Some("Небольшой ежедневный шаг к цели".to_string());
    habit.frequency = Frequency::Daily;
    habit.difficulty = Difficulty::Easy;
    habit
}
