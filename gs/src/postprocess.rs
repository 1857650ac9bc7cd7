//! Validator/Postprocessor - the fixed cleanup pipeline for task lists
//!
//! `filter_invalid_tasks -> deduplicate_tasks -> make_smart ->
//! enhance_tasks_with_context -> prioritize_tasks`
//!
//! A rejected task is dropped on its own; the rest of the batch survives.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Difficulty, Estimate, GoalContext, Priority, Task};
use crate::splitter::has_urgency_keyword;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_WEEK_ESTIMATE: i64 = 52;
pub const MAX_DAY_ESTIMATE: i64 = 365;
pub const MIN_TITLE_CHARS: usize = 3;

/// Titles at or above this word-set similarity count as duplicates
pub const DUPLICATE_SIMILARITY: f64 = 0.8;

/// Deadlines this close (in days) make the first tasks high priority
const DEADLINE_PRESSURE_DAYS: i64 = 7;
const DEADLINE_HIGH_PRIORITY_COUNT: usize = 5;

static PLACEHOLDER_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:задача|task|шаг|step)\s*#?\d+\.?$|(?:todo|tbd)\.?$|\.\.\.|…|placeholder)")
        .expect("placeholder regex is valid")
});

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]+").expect("non-word regex is valid"));

/// Why a task was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("title is empty")]
    EmptyTitle,

    #[error("title has {0} chars (max {MAX_TITLE_CHARS})")]
    TitleTooLong(usize),

    #[error("title '{0}' is shorter than {MIN_TITLE_CHARS} chars")]
    TitleTooShort(String),

    #[error("title '{0}' is a placeholder")]
    Placeholder(String),

    #[error("description has {0} chars (max {MAX_DESCRIPTION_CHARS})")]
    DescriptionTooLong(usize),

    #[error("week_estimate {0} outside 0..={MAX_WEEK_ESTIMATE}")]
    WeekEstimateOutOfRange(i64),

    #[error("day_estimate {0} outside 0..={MAX_DAY_ESTIMATE}")]
    DayEstimateOutOfRange(i64),
}

/// Check the structural bounds of a single task
pub fn validate_task_structure(task: &Task) -> Result<(), ValidationIssue> {
    let title = task.title.trim();
    if title.is_empty() {
        return Err(ValidationIssue::EmptyTitle);
    }
    let title_chars = title.chars().count();
    if title_chars > MAX_TITLE_CHARS {
        return Err(ValidationIssue::TitleTooLong(title_chars));
    }
    if let Some(desc) = &task.description {
        let chars = desc.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(ValidationIssue::DescriptionTooLong(chars));
        }
    }
    match task.estimate {
        Some(Estimate::Weeks(w)) if !(0..=MAX_WEEK_ESTIMATE).contains(&w) => {
            Err(ValidationIssue::WeekEstimateOutOfRange(w))
        }
        Some(Estimate::Days(d)) if !(0..=MAX_DAY_ESTIMATE).contains(&d) => {
            Err(ValidationIssue::DayEstimateOutOfRange(d))
        }
        _ => Ok(()),
    }
}

/// Full acceptance check: structure, placeholder titles, minimum title length
pub fn check_task(task: &Task) -> Result<(), ValidationIssue> {
    validate_task_structure(task)?;
    let title = task.title.trim();
    if PLACEHOLDER_TITLE.is_match(title) {
        return Err(ValidationIssue::Placeholder(title.to_string()));
    }
    if title.chars().count() < MIN_TITLE_CHARS {
        return Err(ValidationIssue::TitleTooShort(title.to_string()));
    }
    Ok(())
}

/// Keep only tasks that pass `check_task`
pub fn filter_invalid_tasks(tasks: Vec<Task>) -> Vec<Task> {
    tasks
        .into_iter()
        .filter(|task| match check_task(task) {
            Ok(()) => true,
            Err(issue) => {
                debug!(id = %task.id, %issue, "filter_invalid_tasks: dropped");
                false
            }
        })
        .collect()
}

/// Lowercase, trim, strip non-word chars and collapse whitespace
pub fn normalize_title(title: &str) -> String {
    NON_WORD
        .replace_all(&title.trim().to_lowercase(), " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of the word sets of two normalized titles
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    intersection as f64 / union as f64
}

/// Drop exact and near-duplicate titles, keeping the first occurrence
pub fn deduplicate_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let mut accepted: Vec<(String, Task)> = Vec::with_capacity(tasks.len());

    for task in tasks {
        let norm = normalize_title(&task.title);
        let duplicate = accepted
            .iter()
            .any(|(seen, _)| *seen == norm || title_similarity(seen, &norm) >= DUPLICATE_SIMILARITY);
        if duplicate {
            debug!(title = %task.title, "deduplicate_tasks: dropped duplicate");
            continue;
        }
        accepted.push((norm, task));
    }

    accepted.into_iter().map(|(_, task)| task).collect()
}

/// Fill in description, acceptance criteria and an estimate where missing
pub fn make_smart(mut task: Task) -> Task {
    let title = task.title.trim().to_string();

    let thin = task
        .description
        .as_deref()
        .is_none_or(|d| d.trim().chars().count() < 10);
    if thin {
        task.description = Some(format!("Выполнить: {}", title));
    }

    let missing_criteria = task.acceptance_criteria.as_deref().is_none_or(|c| c.trim().is_empty());
    if missing_criteria {
        task.acceptance_criteria = Some(format!("Задача «{}» выполнена и результат можно проверить", title));
    }

    if task.estimate.is_none() {
        let weeks = if title.split_whitespace().count() > 10 { 2 } else { 1 };
        task.estimate = Some(Estimate::Weeks(weeks));
    }

    task
}

/// Attach tags and related goals, and scale week estimates by preferred difficulty
pub fn enhance_tasks_with_context(tasks: Vec<Task>, context: &GoalContext) -> Vec<Task> {
    let mut notes = Vec::new();
    if !context.tags.is_empty() {
        notes.push(format!("Связанные теги: {}", context.tags.join(", ")));
    }
    if !context.related_goals.is_empty() {
        notes.push(format!("Связанные цели: {}", context.related_goals.join(", ")));
    }

    tasks
        .into_iter()
        .map(|mut task| {
            if !notes.is_empty() {
                let extra = notes.join("\n");
                task.description = Some(match task.description.take() {
                    Some(desc) => format!("{}\n\n{}", desc, extra),
                    None => extra,
                });
            }

            if let Some(Estimate::Weeks(w)) = task.estimate {
                let scaled = match context.preferred_difficulty {
                    Some(Difficulty::Easy) if w > 2 => (w as f64 * 0.7).ceil() as i64,
                    Some(Difficulty::Hard) if w < 4 => (w as f64 * 1.5).ceil() as i64,
                    _ => w,
                };
                task.estimate = Some(Estimate::Weeks(scaled.min(MAX_WEEK_ESTIMATE)));
            }
            task
        })
        .collect()
}

/// Assign priorities by position, urgency keywords and deadline pressure
pub fn prioritize_tasks(tasks: Vec<Task>, context: &GoalContext, today: NaiveDate) -> Vec<Task> {
    let deadline_close = context
        .deadline
        .is_some_and(|deadline| (deadline - today).num_days() <= DEADLINE_PRESSURE_DAYS);

    tasks
        .into_iter()
        .enumerate()
        .map(|(index, mut task)| {
            let priority = if (deadline_close && index < DEADLINE_HIGH_PRIORITY_COUNT)
                || index == 0
                || has_urgency_keyword(&task.title)
            {
                Priority::High
            } else if index < 3 {
                Priority::Medium
            } else {
                Priority::Low
            };
            task.priority = Some(priority);
            task
        })
        .collect()
}

/// Run the full pipeline, relative to today's date
pub fn postprocess_tasks(tasks: Vec<Task>, context: Option<&GoalContext>) -> Vec<Task> {
    postprocess_tasks_on(tasks, context, Local::now().date_naive())
}

/// Run the full pipeline with an explicit "today"
pub fn postprocess_tasks_on(tasks: Vec<Task>, context: Option<&GoalContext>, today: NaiveDate) -> Vec<Task> {
    let incoming = tasks.len();
    let default_context = GoalContext::default();
    let context = context.unwrap_or(&default_context);

    let tasks = filter_invalid_tasks(tasks);
    let tasks = deduplicate_tasks(tasks);
    let tasks: Vec<Task> = tasks.into_iter().map(make_smart).collect();
    let tasks = enhance_tasks_with_context(tasks, context);
    let tasks = prioritize_tasks(tasks, context, today);

    info!(incoming, kept = tasks.len(), "postprocess_tasks: done");
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn titled(titles: &[&str]) -> Vec<Task> {
        titles.iter().map(|t| Task::new(*t)).collect()
    }

    #[test]
    fn test_structure_bounds() {
        assert!(validate_task_structure(&Task::new("Valid task")).is_ok());
        assert_eq!(validate_task_structure(&Task::new("   ")), Err(ValidationIssue::EmptyTitle));
        assert_eq!(
            validate_task_structure(&Task::new("t".repeat(201))),
            Err(ValidationIssue::TitleTooLong(201))
        );
        assert!(validate_task_structure(&Task::new("t".repeat(200))).is_ok());
        assert_eq!(
            validate_task_structure(&Task::new("Ok title").description("d".repeat(1001))),
            Err(ValidationIssue::DescriptionTooLong(1001))
        );
        assert_eq!(
            validate_task_structure(&Task::new("Ok title").estimate(Estimate::Weeks(53))),
            Err(ValidationIssue::WeekEstimateOutOfRange(53))
        );
        assert_eq!(
            validate_task_structure(&Task::new("Ok title").estimate(Estimate::Days(-1))),
            Err(ValidationIssue::DayEstimateOutOfRange(-1))
        );
        assert!(validate_task_structure(&Task::new("Ok title").estimate(Estimate::Days(365))).is_ok());
    }

    #[test]
    fn test_filter_drops_placeholders_and_short_titles() {
        let tasks = titled(&[
            "Задача 1",
            "...",
            "todo",
            "TODO",
            "Task 12",
            "…и так далее",
            "Placeholder for later",
            "AB",
            "Прочитать главу 3",
            "Task management course",
        ]);
        let kept: Vec<String> = filter_invalid_tasks(tasks).into_iter().map(|t| t.title).collect();
        assert_eq!(kept, vec!["Прочитать главу 3", "Task management course"]);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Read, Chapter-3!  "), "read chapter 3");
        assert_eq!(normalize_title("Прочитать ГЛАВУ 3"), "прочитать главу 3");
    }

    #[test]
    fn test_similarity() {
        assert_eq!(title_similarity("a b c d e", "a b c d e"), 1.0);
        assert_eq!(title_similarity("a b c d", "a b c d e"), 0.8);
        assert!(title_similarity("valid task", "another task") < 0.5);
    }

    #[test]
    fn test_dedupe_exact_and_near() {
        let tasks = titled(&[
            "Read chapter one of the book",
            "read chapter one of the book!",
            "Read chapter one of the book now",
            "Write a summary",
        ]);
        let kept: Vec<String> = deduplicate_tasks(tasks).into_iter().map(|t| t.title).collect();
        // 6/7 words shared with the first title is above the threshold
        assert_eq!(kept, vec!["Read chapter one of the book", "Write a summary"]);
    }

    #[test]
    fn test_make_smart_fills_gaps() {
        let task = make_smart(Task::new("Read chapter 3").description("short"));
        assert_eq!(task.description.as_deref(), Some("Выполнить: Read chapter 3"));
        assert!(task.acceptance_criteria.is_some());
        assert_eq!(task.week_estimate(), Some(1));

        let long_title = "one two three four five six seven eight nine ten eleven";
        assert_eq!(make_smart(Task::new(long_title)).week_estimate(), Some(2));
    }

    #[test]
    fn test_make_smart_keeps_existing_fields() {
        let task = Task::new("Run 5k")
            .description("Run five kilometres without stopping")
            .acceptance("Under 30 minutes")
            .estimate(Estimate::Days(3));
        let smart = make_smart(task.clone());
        assert_eq!(smart, task);
    }

    #[test]
    fn test_enhance_appends_tags_and_scales() {
        let context = GoalContext {
            tags: vec!["python".to_string(), "career".to_string()],
            preferred_difficulty: Some(Difficulty::Hard),
            ..Default::default()
        };
        let tasks = vec![
            Task::new("Learn syntax").description("Basics first").estimate(Estimate::Weeks(2)),
            Task::new("Build project").estimate(Estimate::Weeks(5)),
        ];
        let out = enhance_tasks_with_context(tasks, &context);

        assert_eq!(
            out[0].description.as_deref(),
            Some("Basics first\n\nСвязанные теги: python, career")
        );
        assert_eq!(out[0].week_estimate(), Some(3));
        assert_eq!(out[1].week_estimate(), Some(5));
    }

    #[test]
    fn test_enhance_easy_difficulty() {
        let context = GoalContext {
            preferred_difficulty: Some(Difficulty::Easy),
            ..Default::default()
        };
        let tasks = vec![
            Task::new("A long stage").estimate(Estimate::Weeks(4)),
            Task::new("A short stage").estimate(Estimate::Weeks(2)),
            Task::new("A day stage").estimate(Estimate::Days(10)),
        ];
        let out = enhance_tasks_with_context(tasks, &context);
        assert_eq!(out[0].week_estimate(), Some(3));
        assert_eq!(out[1].week_estimate(), Some(2));
        assert_eq!(out[2].day_estimate(), Some(10));
        assert!(out[0].description.is_none());
    }

    #[test]
    fn test_prioritize_by_position_and_keyword() {
        let tasks = titled(&["First", "Second", "Third", "Fourth", "Срочно позвонить"]);
        let out = prioritize_tasks(tasks, &GoalContext::default(), today());
        let priorities: Vec<Priority> = out.iter().filter_map(|t| t.priority).collect();
        assert_eq!(
            priorities,
            vec![
                Priority::High,
                Priority::Medium,
                Priority::Medium,
                Priority::Low,
                Priority::High
            ]
        );
    }

    #[test]
    fn test_prioritize_deadline_pressure() {
        let context = GoalContext {
            deadline: NaiveDate::from_ymd_opt(2026, 10, 25),
            ..Default::default()
        };
        let tasks = titled(&["a1 step", "a2 step", "a3 step", "a4 step", "a5 step", "a6 step"]);
        let out = prioritize_tasks(tasks, &context, today());
        assert!(out[..5].iter().all(|t| t.priority == Some(Priority::High)));
        assert_eq!(out[5].priority, Some(Priority::Low));

        let far = GoalContext {
            deadline: NaiveDate::from_ymd_opt(2026, 12, 25),
            ..Default::default()
        };
        let out = prioritize_tasks(titled(&["a1 step", "a2 step"]), &far, today());
        assert_eq!(out[1].priority, Some(Priority::Medium));
    }

    #[test]
    fn test_postprocess_scenario() {
        let tasks = titled(&["Valid task", "Valid task", "AB", "Another task"]);
        let out = postprocess_tasks_on(tasks, None, today());

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Valid task");
        assert_eq!(out[1].title, "Another task");
        for task in &out {
            assert!(task.description.is_some());
            assert!(task.acceptance_criteria.is_some());
            assert!(task.priority.is_some());
        }
    }

    proptest! {
        #[test]
        fn prop_postprocess_output_has_no_near_duplicates(
            titles in proptest::collection::vec("[a-c]{1,2}( [a-c]{1,2}){0,4}", 0..25)
        ) {
            let tasks: Vec<Task> = titles.iter().map(Task::new).collect();
            let out = postprocess_tasks_on(tasks, None, today());
            for (i, a) in out.iter().enumerate() {
                for b in out.iter().skip(i + 1) {
                    let sim = title_similarity(&normalize_title(&a.title), &normalize_title(&b.title));
                    prop_assert!(sim < DUPLICATE_SIMILARITY);
                }
            }
            for task in &out {
                prop_assert!(task.description.is_some());
                prop_assert!(task.acceptance_criteria.is_some());
                prop_assert!(task.week_estimate().is_some() ^ task.day_estimate().is_some());
            }
        }
    }
}
