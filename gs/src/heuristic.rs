//! HeuristicGenerator - deterministic, network-free fallback plans
//!
//! The goal text is classified into a domain by keyword (first match wins,
//! `General` catches everything else) and the domain's five-step template is
//! returned, padded with generic filler when more steps are wanted. Same
//! input, same output: ids are derived from the domain and position.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::{Estimate, Task};

/// The fallback never returns fewer steps than this
pub const MIN_HEURISTIC_TASKS: usize = 5;

/// Goal domain used to pick a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Study,
    Fitness,
    Project,
    Habit,
    General,
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Study => write!(f, "study"),
            Self::Fitness => write!(f, "fitness"),
            Self::Project => write!(f, "project"),
            Self::Habit => write!(f, "habit"),
            Self::General => write!(f, "general"),
        }
    }
}

struct Template {
    title: &'static str,
    description: &'static str,
    weeks: i64,
    acceptance: &'static str,
}

const fn step(title: &'static str, description: &'static str, weeks: i64, acceptance: &'static str) -> Template {
    Template {
        title,
        description,
        weeks,
        acceptance,
    }
}

// Ordered by precedence: the first matching domain wins.
static DOMAIN_PATTERNS: LazyLock<Vec<(Domain, Regex)>> = LazyLock::new(|| {
    // Russian entries are stems; English entries are whole words
    [
        (
            Domain::Study,
            r"(?i)\b(?:учи|учеб|изуч|выуч|экзамен|тест|курс|урок|лекци|язык)|\b(?:stud(?:y|ies|ying)|learn(?:s|ed|ing)?|exams?|tests?|courses?|lessons?|lectures?|certif(?:y|ied|icate|ication)s?)\b",
        ),
        (
            Domain::Fitness,
            r"(?i)\b(?:бег|пробеж|марафон|трениров|спорт|фитнес|похуд|отжим|присед|плаван)|\b(?:run(?:s|ning)?|jog(?:s|ging)?|marathons?|workouts?|gym|fitness|lose weight|swim(?:s|ming)?|push-?ups?)\b",
        ),
        (
            Domain::Project,
            r"(?i)\b(?:проект|приложени|сайт|запуст|разработ|стартап|бизнес)|\b(?:projects?|apps?|websites?|launch(?:es|ed|ing)?|build(?:s|ing)?|develop(?:s|ed|ing)?|startups?|mvp)\b",
        ),
        (
            Domain::Habit,
            r"(?i)\b(?:привычк|каждый день|ежедневн|регулярн|бросить|отказаться от)|\b(?:habits?|daily|every day|quit(?:ting)?)\b",
        ),
    ]
    .into_iter()
    .map(|(domain, pattern)| (domain, Regex::new(pattern).expect("domain regex is valid")))
    .collect()
});

const STUDY: [Template; 5] = [
    step(
        "Определить программу и источники обучения",
        "Составить список тем, выбрать курс, книги и другие материалы.",
        1,
        "Есть список тем и выбранные материалы",
    ),
    step(
        "Изучить базовые понятия",
        "Пройти основные темы по порядку и вести конспект.",
        2,
        "Конспект по основным темам готов",
    ),
    step(
        "Закрепить материал на практике",
        "Решать упражнения и задачи по каждой изученной теме.",
        2,
        "Решено не менее 10 практических заданий",
    ),
    step(
        "Повторить сложные темы",
        "Вернуться к темам, где были ошибки, и разобрать их заново.",
        1,
        "Все сложные темы разобраны повторно",
    ),
    step(
        "Пройти итоговую проверку знаний",
        "Сдать тест, экзамен или выполнить контрольное задание.",
        1,
        "Итоговая проверка пройдена",
    ),
];

const FITNESS: [Template; 5] = [
    step(
        "Оценить текущую физическую форму",
        "Записать исходные показатели: вес, выносливость, силовые результаты.",
        1,
        "Исходные показатели записаны",
    ),
    step(
        "Составить план тренировок",
        "Определить дни, длительность и тип тренировок на месяц.",
        1,
        "Расписание тренировок составлено",
    ),
    step(
        "Провести первые тренировки по плану",
        "Выполнить тренировки первых двух недель без пропусков.",
        2,
        "Все запланированные тренировки выполнены",
    ),
    step(
        "Постепенно увеличить нагрузку",
        "Повышать объём или интенсивность не более чем на 10% в неделю.",
        3,
        "Нагрузка выросла без травм",
    ),
    step(
        "Проверить результат контрольной тренировкой",
        "Повторить исходные замеры и сравнить с началом.",
        1,
        "Контрольные показатели лучше исходных",
    ),
];

const PROJECT: [Template; 5] = [
    step(
        "Сформулировать цель и объём проекта",
        "Описать результат, ограничения и что точно не входит в проект.",
        1,
        "Цель и границы проекта записаны",
    ),
    step(
        "Разбить проект на этапы",
        "Составить список этапов с ожидаемым результатом каждого.",
        1,
        "План этапов готов",
    ),
    step(
        "Реализовать первую рабочую версию",
        "Сделать минимальную версию, которую можно показать.",
        3,
        "Первая версия работает",
    ),
    step(
        "Протестировать и собрать обратную связь",
        "Показать результат другим и записать замечания.",
        2,
        "Собраны и записаны замечания",
    ),
    step(
        "Доработать и завершить проект",
        "Исправить замечания и довести проект до готового состояния.",
        2,
        "Проект завершён и готов к использованию",
    ),
];

const HABIT: [Template; 5] = [
    step(
        "Выбрать конкретное действие и время",
        "Определить, что именно, когда и где вы будете делать.",
        1,
        "Действие, время и место выбраны",
    ),
    step(
        "Подготовить окружение и напоминания",
        "Убрать препятствия и настроить напоминание в телефоне.",
        1,
        "Напоминания настроены",
    ),
    step(
        "Выполнять привычку ежедневно первую неделю",
        "Начать с минимального объёма, чтобы не сорваться.",
        1,
        "Семь дней подряд без пропусков",
    ),
    step(
        "Отслеживать выполнение и пропуски",
        "Отмечать каждый день в трекере и разбирать причины пропусков.",
        2,
        "Трекер заполняется каждый день",
    ),
    step(
        "Подвести итоги месяца",
        "Оценить, закрепилась ли привычка, и скорректировать план.",
        1,
        "Итоги месяца записаны",
    ),
];

const GENERAL: [Template; 5] = [
    step(
        "Уточнить цель и критерий успеха",
        "Сформулировать, что будет считаться достижением цели.",
        1,
        "Критерий успеха записан",
    ),
    step(
        "Собрать необходимые ресурсы",
        "Определить, что понадобится: время, деньги, знания, помощь.",
        1,
        "Список ресурсов готов",
    ),
    step(
        "Сделать первый практический шаг",
        "Выполнить самое простое действие, которое приближает к цели.",
        1,
        "Первый шаг выполнен",
    ),
    step(
        "Проверить промежуточный результат",
        "Сравнить сделанное с планом и скорректировать его.",
        2,
        "План скорректирован по итогам проверки",
    ),
    step(
        "Завершить и подвести итоги",
        "Довести работу до конца и записать выводы.",
        1,
        "Цель достигнута, выводы записаны",
    ),
];

const FILLER: [Template; 4] = [
    step(
        "Проанализировать прогресс",
        "Сравнить текущий результат с целью.",
        1,
        "Выводы по прогрессу записаны",
    ),
    step(
        "Устранить найденные пробелы",
        "Поработать над слабыми местами, выявленными при анализе.",
        1,
        "Пробелы устранены",
    ),
    step(
        "Закрепить достигнутый результат",
        "Повторить то, что уже получилось, чтобы не потерять навык.",
        1,
        "Результат стабилен",
    ),
    step(
        "Спланировать следующий шаг",
        "Решить, что делать дальше, и записать план.",
        1,
        "План следующего шага готов",
    ),
];

/// Classify goal text into a domain; earlier domains take precedence
pub fn classify_domain(text: &str) -> Domain {
    DOMAIN_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(domain, _)| *domain)
        .unwrap_or(Domain::General)
}

fn template_for(domain: Domain) -> &'static [Template; 5] {
    match domain {
        Domain::Study => &STUDY,
        Domain::Fitness => &FITNESS,
        Domain::Project => &PROJECT,
        Domain::Habit => &HABIT,
        Domain::General => &GENERAL,
    }
}

/// Produce a templated plan of at least five steps (or `min_count`, if larger)
///
/// Urgent plans carry day estimates (weeks * 7); others carry week estimates.
pub fn heuristic_tasks(text: &str, min_count: usize, urgent: bool) -> Vec<Task> {
    let domain = classify_domain(text);
    let count = min_count.max(MIN_HEURISTIC_TASKS);
    debug!(%domain, count, urgent, "heuristic_tasks: called");

    let mut tasks: Vec<Task> = template_for(domain)
        .iter()
        .enumerate()
        .map(|(i, t)| build(format!("heuristic-{}-{}", domain, i + 1), t.title.to_string(), t, urgent))
        .collect();

    let mut filler = 0usize;
    while tasks.len() < count {
        let t = &FILLER[filler % FILLER.len()];
        let round = filler / FILLER.len() + 1;
        let title = if round == 1 {
            t.title.to_string()
        } else {
            format!("{} (этап {})", t.title, round)
        };
        tasks.push(build(format!("heuristic-{}-{}", domain, tasks.len() + 1), title, t, urgent));
        filler += 1;
    }

    tasks
}

fn build(id: String, title: String, template: &Template, urgent: bool) -> Task {
    Task::with_id(id, title)
        .description(template.description)
        .acceptance(template.acceptance)
        .estimate(Estimate::Weeks(template.weeks).for_urgency(urgent))
}
