//! Prompt variants for goal decomposition
//!
//! Three escalating variants per urgency mode, plus the anti-echo retry and
//! the expansion request.

use crate::domain::{SplitOptions, Task};

/// Which prompt to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Structured instructions with a JSON example
    Structured,
    /// Same request, insisting on JSON only
    JsonOnly,
    /// Exact schema, nothing else allowed
    StrictSchema,
    /// The previous answer repeated the goal; forbid that
    NoEcho,
}

impl std::fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::JsonOnly => write!(f, "json-only"),
            Self::StrictSchema => write!(f, "strict-schema"),
            Self::NoEcho => write!(f, "no-echo"),
        }
    }
}

fn estimate_field(urgent: bool) -> (&'static str, &'static str) {
    if urgent {
        ("day_estimate", "число дней (0-365)")
    } else {
        ("week_estimate", "число недель (0-52)")
    }
}

fn context_block(options: &SplitOptions) -> String {
    let mut lines = Vec::new();
    if let Some(baseline) = &options.baseline {
        lines.push(format!("- Исходный уровень: {}", baseline));
    }
    if let Some(unit) = &options.unit {
        lines.push(format!("- Единица измерения: {}", unit));
    }
    if let Some(frequency) = &options.frequency {
        lines.push(format!("- Частота занятий: {}", frequency));
    }
    if let Some(constraints) = &options.constraints {
        lines.push(format!("- Ограничения: {}", constraints));
    }
    if let Some(date) = options.target_date {
        lines.push(format!("- Срок: {}", date.format("%Y-%m-%d")));
    }
    if lines.is_empty() {
        String::new()
    } else {
        format!("\nКонтекст:\n{}\n", lines.join("\n"))
    }
}

/// Render a decomposition prompt
pub fn build_prompt(
    variant: PromptVariant,
    description: &str,
    options: &SplitOptions,
    urgent: bool,
    desired_min: usize,
) -> String {
    let (field, field_hint) = estimate_field(urgent);
    let pace = if urgent {
        "Цель срочная: планируй по дням, каждый шаг должен укладываться в несколько дней."
    } else {
        "Планируй по неделям."
    };
    let context = context_block(options);
    let example = format!(
        r#"{{"tasks": [{{"title": "...", "description": "...", "{}": 1, "acceptance_criteria": "..."}}]}}"#,
        field
    );

    match variant {
        PromptVariant::Structured => format!(
            "Разбей цель на конкретные, проверяемые шаги.\n\
             Цель: {description}\n{context}\n\
             {pace}\n\
             Нужно не меньше {desired_min} шагов, упорядоченных по времени выполнения.\n\
             Для каждого шага укажи: title (до 120 символов), description, {field} ({field_hint}), acceptance_criteria.\n\
             Ответ в формате JSON: {example}"
        ),
        PromptVariant::JsonOnly => format!(
            "Верни ТОЛЬКО JSON без пояснений и markdown.\n\
             Цель: {description}\n{context}\n\
             {pace}\n\
             Минимум {desired_min} шагов. Формат: {example}"
        ),
        PromptVariant::StrictSchema => format!(
            "Строго следуй схеме. Любой текст вне JSON запрещён.\n\
             Схема: {{\"tasks\": [{{\"title\": string, \"description\": string, \"{field}\": integer, \"acceptance_criteria\": string}}]}}\n\
             Массив tasks содержит ровно {desired_min} или больше элементов; title не пустой и не повторяет цель.\n\
             Цель: {description}{context}"
        ),
        PromptVariant::NoEcho => format!(
            "Предыдущий ответ просто повторил цель. НЕ повторяй текст цели как шаг.\n\
             Разбей цель на {desired_min} или больше РАЗНЫХ конкретных шагов, каждый меньше самой цели.\n\
             Цель: {description}\n{context}\n\
             {pace}\n\
             Ответ только в JSON: {example}"
        ),
    }
}

/// Ask a provider to grow an existing plan to at least `desired_min` steps
pub fn build_expand_prompt(description: &str, existing: &[Task], urgent: bool, desired_min: usize) -> String {
    let (field, _) = estimate_field(urgent);
    let steps = existing
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.title))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Цель: {description}\n\
         Текущие шаги:\n{steps}\n\n\
         Расширь план до не менее чем {desired_min} шагов: сохрани текущие шаги и добавь недостающие, \
         разбив крупные шаги на более мелкие.\n\
         Ответ только в JSON: {{\"tasks\": [{{\"title\": \"...\", \"description\": \"...\", \"{field}\": 1}}]}}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_prompt_mentions_goal_and_count() {
        let prompt = build_prompt(
            PromptVariant::Structured,
            "Выучить Python",
            &SplitOptions::default(),
            false,
            6,
        );
        assert!(prompt.contains("Выучить Python"));
        assert!(prompt.contains("не меньше 6 шагов"));
        assert!(prompt.contains("week_estimate"));
        assert!(!prompt.contains("day_estimate"));
    }

    #[test]
    fn test_urgent_prompt_uses_days() {
        for variant in [
            PromptVariant::Structured,
            PromptVariant::JsonOnly,
            PromptVariant::StrictSchema,
            PromptVariant::NoEcho,
        ] {
            let prompt = build_prompt(variant, "Сдать отчёт завтра", &SplitOptions::default(), true, 5);
            assert!(prompt.contains("day_estimate"), "{variant} should ask for days");
        }
    }

    #[test]
    fn test_variants_differ() {
        let opts = SplitOptions::default();
        let a = build_prompt(PromptVariant::Structured, "Goal", &opts, false, 3);
        let b = build_prompt(PromptVariant::JsonOnly, "Goal", &opts, false, 3);
        let c = build_prompt(PromptVariant::StrictSchema, "Goal", &opts, false, 3);
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_context_rendered() {
        let opts = SplitOptions {
            baseline: Some("бегаю 2 км".to_string()),
            constraints: Some("только вечером".to_string()),
            target_date: NaiveDate::from_ymd_opt(2026, 12, 1),
            ..Default::default()
        };
        let prompt = build_prompt(PromptVariant::JsonOnly, "Пробежать 10 км", &opts, false, 4);
        assert!(prompt.contains("Исходный уровень: бегаю 2 км"));
        assert!(prompt.contains("Ограничения: только вечером"));
        assert!(prompt.contains("Срок: 2026-12-01"));
    }

    #[test]
    fn test_expand_prompt_lists_steps() {
        let existing = vec![Task::new("Купить кроссовки"), Task::new("Пробежать 3 км")];
        let prompt = build_expand_prompt("Пробежать 10 км", &existing, false, 6);
        assert!(prompt.contains("1. Купить кроссовки"));
        assert!(prompt.contains("2. Пробежать 3 км"));
        assert!(prompt.contains("не менее чем 6 шагов"));
    }
}
