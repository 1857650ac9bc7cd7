//! ResponseParser - tolerant conversion of provider payloads into tasks
//!
//! Strategies run in a fixed order and the first one producing tasks wins:
//!
//! 1. structured JSON (`{"tasks": [...]}` or a bare array of task objects)
//! 2. JSON hidden in text (whole text, code fence, or outermost brace block)
//! 3. one task per meaningful line of text, falling back to the caller's text
//!
//! When nothing yields a task the parser reports `ParseOutcome::Failure`
//! instead of erroring; the splitter decides what to escalate to.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::{Estimate, MAX_GENERATED_TITLE_CHARS, Task, split_title};
use crate::provider::RawPayload;

/// Longest title taken from a plain-text line
const MAX_LINE_TITLE_CHARS: usize = 100;

/// Lines this short are noise ("OK", "Plan:")
const MIN_LINE_CHARS: usize = 5;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-*•·–—+>#]+\s*|\(?\d{1,3}\s*[.):]\s*|(?:step|шаг|этап)\s*\d+\s*[.):-]?\s*)+")
        .expect("list marker regex is valid")
});

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("code fence regex is valid"));

/// Result of parsing one provider payload
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Tasks(Vec<Task>),
    Failure,
}

impl ParseOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ParseOutcome::Failure)
    }

    pub fn into_tasks(self) -> Option<Vec<Task>> {
        match self {
            ParseOutcome::Tasks(tasks) => Some(tasks),
            ParseOutcome::Failure => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ParseOutcome::Tasks(tasks) => tasks.len(),
            ParseOutcome::Failure => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse a raw provider payload into tasks, using `fallback_text` as a last resort
pub fn parse_tasks(raw: &RawPayload, fallback_text: &str) -> ParseOutcome {
    debug!(?raw, "parse_tasks: called");
    let tasks = structured_tasks(raw)
        .or_else(|| embedded_json_tasks(raw))
        .or_else(|| line_tasks(raw, fallback_text));

    match tasks {
        Some(tasks) if !tasks.is_empty() => {
            debug!(count = tasks.len(), "parse_tasks: parsed");
            ParseOutcome::Tasks(tasks)
        }
        _ => {
            debug!("parse_tasks: no tasks found");
            ParseOutcome::Failure
        }
    }
}

fn structured_tasks(raw: &RawPayload) -> Option<Vec<Task>> {
    match raw {
        RawPayload::Json(value) => tasks_from_value(value),
        RawPayload::Text(_) => None,
    }
}

fn embedded_json_tasks(raw: &RawPayload) -> Option<Vec<Task>> {
    match raw {
        RawPayload::Text(text) => extract_json(text).and_then(|value| tasks_from_value(&value)),
        RawPayload::Json(Value::String(text)) => extract_json(text).and_then(|value| tasks_from_value(&value)),
        RawPayload::Json(_) => None,
    }
}

fn line_tasks(raw: &RawPayload, fallback_text: &str) -> Option<Vec<Task>> {
    let source = match raw {
        RawPayload::Text(text) if !text.trim().is_empty() => text.as_str(),
        _ => fallback_text,
    };
    let tasks = tasks_from_lines(source);
    if tasks.is_empty() { None } else { Some(tasks) }
}

/// Find a JSON value in free text: the whole text, a code fence, or the outermost braces
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    if let Some(captures) = CODE_FENCE.captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(captures[1].trim()) {
            debug!("extract_json: found fenced JSON");
            return Some(value);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    debug!(%open, "extract_json: found embedded JSON block");
                    return Some(value);
                }
            }
        }
    }

    None
}

/// Map a `{"tasks": [...]}` object or bare array into tasks
///
/// Entries without a non-blank string `title` are skipped. Returns `None`
/// when no entry survives.
pub fn tasks_from_value(value: &Value) -> Option<Vec<Task>> {
    let entries = match value {
        Value::Object(map) => map.get("tasks")?.as_array()?,
        Value::Array(items) => items,
        _ => return None,
    };

    let tasks: Vec<Task> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(task_from_object)
        .collect();

    if tasks.is_empty() { None } else { Some(tasks) }
}

fn task_from_object(obj: &Map<String, Value>) -> Option<Task> {
    let title = obj.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let mut task = Task::new(title);

    if let Some(desc) = string_field(obj, &["description"]) {
        task.description = Some(desc);
    }
    if let Some(criteria) = string_field(obj, &["acceptance_criteria", "acceptanceCriteria"]) {
        task.acceptance_criteria = Some(criteria);
    }

    let weeks = number_field(obj, &["week_estimate", "weekEstimate"]);
    let days = number_field(obj, &["day_estimate", "dayEstimate"]);
    task.estimate = match (weeks, days) {
        (Some(w), _) => Some(Estimate::Weeks(w)),
        (None, Some(d)) => Some(Estimate::Days(d)),
        (None, None) => None,
    };

    task.clamp_title(MAX_GENERATED_TITLE_CHARS);
    Some(task)
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().filter_map(|k| obj.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// One task per line longer than five chars, list markers stripped
pub fn tasks_from_lines(text: &str) -> Vec<Task> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .map(|line| {
            let (title, overflow) = split_title(&line, MAX_LINE_TITLE_CHARS);
            let mut task = Task::new(title);
            task.description = overflow;
            task
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titles(outcome: ParseOutcome) -> Vec<String> {
        outcome
            .into_tasks()
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    #[test]
    fn test_structured_tasks_with_mixed_field_names() {
        let raw = RawPayload::Json(json!({
            "tasks": [
                {"title": "Read chapter 1", "description": "Intro", "week_estimate": 1, "acceptance_criteria": "Notes written"},
                {"title": "Solve exercises", "dayEstimate": 3, "acceptanceCriteria": "10 solved"},
                {"description": "no title"},
                {"title": "   "},
                "not an object"
            ]
        }));

        let tasks = parse_tasks(&raw, "fallback").into_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Read chapter 1");
        assert_eq!(tasks[0].description.as_deref(), Some("Intro"));
        assert_eq!(tasks[0].week_estimate(), Some(1));
        assert_eq!(tasks[0].acceptance_criteria.as_deref(), Some("Notes written"));
        assert_eq!(tasks[1].day_estimate(), Some(3));
        assert_eq!(tasks[1].acceptance_criteria.as_deref(), Some("10 solved"));
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let raw = RawPayload::Json(json!([{"title": "Buy running shoes"}]));
        assert_eq!(titles(parse_tasks(&raw, "")), vec!["Buy running shoes"]);
    }

    #[test]
    fn test_numeric_string_estimate() {
        let raw = RawPayload::Json(json!({"tasks": [{"title": "Draft outline", "week_estimate": "2"}]}));
        let tasks = parse_tasks(&raw, "").into_tasks().unwrap();
        assert_eq!(tasks[0].week_estimate(), Some(2));
    }

    #[test]
    fn test_json_string_payload() {
        let raw = RawPayload::Text(r#"{"tasks":[{"title":"Set up repository"}]}"#.to_string());
        assert_eq!(titles(parse_tasks(&raw, "")), vec!["Set up repository"]);
    }

    #[test]
    fn test_fenced_json_in_prose() {
        let raw = RawPayload::Text(
            "Here is your plan:\n```json\n{\"tasks\": [{\"title\": \"Write tests\"}]}\n```\nGood luck!".to_string(),
        );
        assert_eq!(titles(parse_tasks(&raw, "")), vec!["Write tests"]);
    }

    #[test]
    fn test_brace_block_in_prose() {
        let raw = RawPayload::Text("Sure! {\"tasks\": [{\"title\": \"Ship v1\"}]} Anything else?".to_string());
        assert_eq!(titles(parse_tasks(&raw, "")), vec!["Ship v1"]);
    }

    #[test]
    fn test_lines_with_markers() {
        let raw = RawPayload::Text("Plan\n1. Прочитать главу 3\n- Решить задачи\n\n* Ok\nШаг 4: Сдать экзамен".to_string());
        assert_eq!(
            titles(parse_tasks(&raw, "")),
            vec!["Прочитать главу 3", "Решить задачи", "Сдать экзамен"]
        );
    }

    #[test]
    fn test_long_line_folds_into_description() {
        let line = "x".repeat(130);
        let tasks = parse_tasks(&RawPayload::Text(line), "").into_tasks().unwrap();
        assert_eq!(tasks[0].title.chars().count(), 100);
        assert_eq!(tasks[0].description.as_deref().map(str::len), Some(30));
    }

    #[test]
    fn test_long_structured_title_clamped_to_generation_bound() {
        let title = "y".repeat(150);
        let raw = RawPayload::Json(json!({"tasks": [{"title": title}]}));
        let tasks = parse_tasks(&raw, "").into_tasks().unwrap();
        assert_eq!(tasks[0].title.chars().count(), MAX_GENERATED_TITLE_CHARS);
    }

    #[test]
    fn test_empty_tasks_falls_back_to_text() {
        let raw = RawPayload::Json(json!({"tasks": []}));
        assert_eq!(
            titles(parse_tasks(&raw, "Learn to juggle three balls")),
            vec!["Learn to juggle three balls"]
        );
    }

    #[test]
    fn test_blank_text_uses_fallback() {
        let raw = RawPayload::Text("   ".to_string());
        assert_eq!(titles(parse_tasks(&raw, "Run a marathon")), vec!["Run a marathon"]);
    }

    #[test]
    fn test_nothing_usable_is_failure() {
        let raw = RawPayload::Json(json!({"status": "ok"}));
        let outcome = parse_tasks(&raw, "abc");
        assert!(outcome.is_failure());
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_extract_json_ignores_scalars() {
        assert!(extract_json("42").is_none());
        assert!(extract_json("").is_none());
        assert_eq!(extract_json("[1, 2]"), Some(json!([1, 2])));
    }
}
