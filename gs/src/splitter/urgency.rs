//! Urgency classification and desired task counts

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::{SplitOptions, Tempo};

/// Target dates this close (in days) make a goal urgent
pub const URGENT_WITHIN_DAYS: i64 = 3;

static URGENT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:сегодня|завтра|срочн|немедленно|(?:этим\s+|сегодня\s+)?утром|today|tomorrow|tonight|urgent|urgently|asap|immediately|this\s+morning)",
    )
    .expect("urgency regex is valid")
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?\n]+").expect("sentence regex is valid"));

/// Whether the text mentions an urgency keyword ("завтра", "asap", ...)
pub fn has_urgency_keyword(text: &str) -> bool {
    URGENT_KEYWORDS.is_match(text)
}

/// Classify a goal as urgent (day-scale) or not (week-scale)
///
/// Urgent when forced, when the text carries an urgency keyword, or when the
/// target date is at most three days after `today`.
pub fn classify_urgency(description: &str, options: &SplitOptions, today: NaiveDate) -> bool {
    if options.force_daily {
        debug!("classify_urgency: forced daily");
        return true;
    }
    if has_urgency_keyword(description) {
        debug!("classify_urgency: keyword match");
        return true;
    }
    match options.target_date {
        Some(date) => {
            let days = (date - today).num_days();
            debug!(days, "classify_urgency: target date");
            days <= URGENT_WITHIN_DAYS
        }
        None => false,
    }
}

/// Words and sentences in a description; a non-blank text has at least one sentence
pub fn text_stats(description: &str) -> (usize, usize) {
    let words = description.split_whitespace().count();
    let sentences = SENTENCE_END
        .split(description)
        .filter(|s| !s.trim().is_empty())
        .count();
    (words, sentences.max(usize::from(words > 0)))
}

/// Minimum number of tasks a decomposition should produce
///
/// Non-urgent: `max(2 * sentences, words / 8)` in [3, 12].
/// Urgent: `max(sentences + 2, words / 10)` in [5, 12].
/// The result is scaled by the tempo factor and rounded, never below 1.
pub fn desired_min_count(description: &str, urgent: bool, tempo: Tempo) -> usize {
    let (words, sentences) = text_stats(description);
    let base = if urgent {
        (sentences + 2).max(words / 10).clamp(5, 12)
    } else {
        (sentences * 2).max(words / 8).clamp(3, 12)
    };
    let scaled = (base as f64 * tempo.factor()).round() as usize;
    debug!(words, sentences, urgent, base, scaled, "desired_min_count: computed");
    scaled.max(1)
}
