//! Expander - grow a short task list to a target length without a provider
//!
//! New steps are mined, in order, from the clauses of existing task
//! descriptions, then from sentences of the original goal text, then from a
//! fixed generic template. Every source is finite and the template always
//! adds a step, so expansion finishes in at most `target` iterations.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::{Estimate, MAX_GENERATED_TITLE_CHARS, Task, split_title};

/// Fragments this short are too vague to become steps
const MIN_FRAGMENT_CHARS: usize = 10;

static CLAUSE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;:!?\n]+|,\s+|\s+[-–—]\s+").expect("clause regex is valid"));

static SENTENCE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("sentence regex is valid"));

const GENERIC_STEPS: [&str; 5] = [
    "Уточнить детали и требования",
    "Подготовить необходимые материалы",
    "Выполнить основную часть работы",
    "Проверить качество результата",
    "Подвести итоги и зафиксировать выводы",
];

/// Expand `existing` to `max(target, existing.len())` tasks
pub fn expand_tasks(existing: &[Task], original_text: &str, target: usize) -> Vec<Task> {
    debug!(existing = existing.len(), target, "expand_tasks: called");
    let mut tasks = existing.to_vec();
    if tasks.len() >= target {
        return tasks;
    }

    let urgent = existing.iter().any(|t| t.day_estimate().is_some());
    let unit = if urgent { Estimate::Days(1) } else { Estimate::Weeks(1) };
    let mut seen: HashSet<String> = tasks.iter().map(|t| t.title.trim().to_lowercase()).collect();

    let mut push = |tasks: &mut Vec<Task>, title: &str, parent: Option<&str>| -> bool {
        let (title, overflow) = split_title(title, MAX_GENERATED_TITLE_CHARS);
        if !seen.insert(title.to_lowercase()) {
            return false;
        }
        let id = format!("expanded-{}", tasks.len() + 1);
        let mut task = Task::with_id(id, title).estimate(unit);
        task.description = match (parent, overflow) {
            (Some(parent), _) => Some(format!("Часть задачи «{}»", parent)),
            (None, overflow) => overflow,
        };
        tasks.push(task);
        true
    };

    // 1. clauses of existing descriptions
    for source in existing {
        let Some(desc) = source.description.as_deref() else {
            continue;
        };
        for fragment in fragments(&CLAUSE_DELIMITERS, desc) {
            if tasks.len() >= target {
                return tasks;
            }
            push(&mut tasks, &fragment, Some(&source.title));
        }
    }

    // 2. sentences of the original goal text
    for fragment in fragments(&SENTENCE_DELIMITERS, original_text) {
        if tasks.len() >= target {
            return tasks;
        }
        push(&mut tasks, &fragment, None);
    }

    // 3. generic steps, numbered after the first pass
    let mut cursor = 0usize;
    while tasks.len() < target {
        let base = GENERIC_STEPS[cursor % GENERIC_STEPS.len()];
        let round = cursor / GENERIC_STEPS.len() + 1;
        let title = if round == 1 {
            base.to_string()
        } else {
            format!("{} ({})", base, round)
        };
        if !push(&mut tasks, &title, None) {
            debug!(%title, "expand_tasks: generic step already present");
        }
        cursor += 1;
    }

    tasks
}

fn fragments(delimiters: &Regex, text: &str) -> Vec<String> {
    delimiters
        .split(text)
        .map(str::trim)
        .filter(|f| f.chars().count() > MIN_FRAGMENT_CHARS)
        .map(str::to_string)
        .collect()
}
