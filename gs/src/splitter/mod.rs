//! GoalSplitter - free-text goal to an ordered list of checkable tasks
//!
//! Decomposition runs as a small state machine:
//!
//! ```text
//! TryPrimary -> TryJsonOnly -> TryStrict -> Heuristic -> Done
//!      \             \             \
//!       +-------------+-------------+--> (echo retry) -> Expand -> Done
//! ```
//!
//! Each prompt attempt is bounded by a per-attempt timeout and the overall
//! deadline, with capped exponential backoff between attempts. Whatever
//! happens upstream, a non-blank description always produces at least one
//! task: total provider failure ends in the local heuristic generator.

mod prompts;
mod urgency;

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub use prompts::{PromptVariant, build_expand_prompt, build_prompt};
pub use urgency::{URGENT_WITHIN_DAYS, classify_urgency, desired_min_count, has_urgency_keyword, text_stats};

use crate::config::SplitterConfig;
use crate::domain::{GoalContext, MAX_GENERATED_TITLE_CHARS, SplitOptions, Task};
use crate::expander::expand_tasks;
use crate::heuristic::heuristic_tasks;
use crate::parser::{ParseOutcome, parse_tasks};
use crate::postprocess::postprocess_tasks;
use crate::provider::{CallOptions, ProviderOrchestrator};

/// Upper bound on state transitions for one split
const MAX_TRANSITIONS: usize = 8;

/// States of one decomposition run
#[derive(Debug)]
enum SplitState {
    TryPrimary,
    TryJsonOnly,
    TryStrict,
    Expand(Vec<Task>),
    Heuristic,
    Done(Vec<Task>),
}

/// Per-call facts shared by every state
struct SplitRun<'a> {
    description: &'a str,
    options: &'a SplitOptions,
    urgent: bool,
    desired_min: usize,
    deadline: Instant,
    attempts: u32,
}

pub struct GoalSplitter {
    orchestrator: Arc<ProviderOrchestrator>,
    config: SplitterConfig,
    call_options: CallOptions,
}

impl GoalSplitter {
    /// Each provider call inherits the attempt timeout, so a hung provider
    /// fails over to the next one instead of using up the whole attempt
    pub fn new(orchestrator: Arc<ProviderOrchestrator>, config: SplitterConfig) -> Self {
        let call_options = orchestrator
            .defaults()
            .clone()
            .with_provider_timeout(config.attempt_timeout());
        Self {
            orchestrator,
            config,
            call_options,
        }
    }

    /// Decompose a goal; relative dates are measured from today
    pub async fn split(&self, description: &str, options: &SplitOptions) -> Vec<Task> {
        self.split_on(description, options, Local::now().date_naive()).await
    }

    /// Decompose and run the postprocessing pipeline on the result
    pub async fn split_and_postprocess(
        &self,
        description: &str,
        options: &SplitOptions,
        context: Option<&GoalContext>,
    ) -> Vec<Task> {
        let tasks = self.split(description, options).await;
        postprocess_tasks(tasks, context)
    }

    /// Decompose a goal with an explicit "today"
    ///
    /// Blank input returns an empty list without calling any provider. The
    /// result is not postprocessed.
    pub async fn split_on(&self, description: &str, options: &SplitOptions, today: NaiveDate) -> Vec<Task> {
        let description = description.trim();
        if description.is_empty() {
            debug!("split_on: blank description");
            return Vec::new();
        }

        let urgent = classify_urgency(description, options, today);
        let desired_min = desired_min_count(description, urgent, options.tempo);
        info!(urgent, desired_min, tempo = %options.tempo, "split_on: decomposing goal");

        let mut run = SplitRun {
            description,
            options,
            urgent,
            desired_min,
            deadline: Instant::now() + self.config.overall_deadline(),
            attempts: 0,
        };

        let mut state = SplitState::TryPrimary;
        for _ in 0..MAX_TRANSITIONS {
            debug!(state = state.name(), "split_on: state");
            state = match state {
                SplitState::TryPrimary => self.try_variant(&mut run, PromptVariant::Structured, SplitState::TryJsonOnly).await,
                SplitState::TryJsonOnly => self.try_variant(&mut run, PromptVariant::JsonOnly, SplitState::TryStrict).await,
                SplitState::TryStrict => self.try_variant(&mut run, PromptVariant::StrictSchema, SplitState::Heuristic).await,
                SplitState::Expand(tasks) => SplitState::Done(self.expand(&mut run, tasks).await),
                SplitState::Heuristic => {
                    warn!("split_on: no provider produced tasks, using heuristic plan");
                    SplitState::Done(heuristic_tasks(description, desired_min, urgent))
                }
                SplitState::Done(tasks) => return finalize(tasks, urgent),
            };
        }

        // Every path reaches Done within MAX_TRANSITIONS; this only guards the loop.
        match state {
            SplitState::Done(tasks) => finalize(tasks, urgent),
            _ => finalize(heuristic_tasks(description, desired_min, urgent), urgent),
        }
    }

    /// Send one prompt variant; on success move to echo handling, else to `on_failure`
    async fn try_variant(&self, run: &mut SplitRun<'_>, variant: PromptVariant, on_failure: SplitState) -> SplitState {
        let prompt = build_prompt(variant, run.description, run.options, run.urgent, run.desired_min);
        let Some(tasks) = self.attempt(run, &prompt, variant.to_string().as_str()).await else {
            return on_failure;
        };
        info!(%variant, count = tasks.len(), "try_variant: accepted");

        let tasks = self.handle_echo(run, tasks).await;
        if tasks.len() < run.desired_min {
            SplitState::Expand(tasks)
        } else {
            SplitState::Done(tasks)
        }
    }

    /// Retry once with a stricter prompt when the answer just repeats the goal
    async fn handle_echo(&self, run: &mut SplitRun<'_>, tasks: Vec<Task>) -> Vec<Task> {
        let echoed = tasks.len() == 1 && is_echo(&tasks[0].title, run.description, &self.config);
        if !echoed {
            return tasks;
        }

        info!("handle_echo: single task repeats the goal, retrying");
        let prompt = build_prompt(PromptVariant::NoEcho, run.description, run.options, run.urgent, run.desired_min);
        match self.attempt(run, &prompt, "no-echo").await {
            Some(retry) if retry.len() >= run.desired_min => retry,
            Some(retry) => {
                debug!(count = retry.len(), "handle_echo: retry too short, keeping original");
                tasks
            }
            None => tasks,
        }
    }

    /// Grow a short list: ask a provider first, then expand locally
    async fn expand(&self, run: &mut SplitRun<'_>, mut tasks: Vec<Task>) -> Vec<Task> {
        debug!(count = tasks.len(), desired_min = run.desired_min, "expand: called");

        if self.config.expand_via_provider {
            let prompt = build_expand_prompt(run.description, &tasks, run.urgent, run.desired_min);
            if let Some(expanded) = self.attempt(run, &prompt, "expand").await {
                if expanded.len() > tasks.len() {
                    info!(count = expanded.len(), "expand: provider expanded the plan");
                    tasks = expanded;
                }
            }
        }

        if tasks.len() < run.desired_min {
            info!(count = tasks.len(), desired_min = run.desired_min, "expand: expanding locally");
            tasks = expand_tasks(&tasks, run.description, run.desired_min);
        }
        tasks
    }

    /// One orchestrator call bounded by the overall deadline
    ///
    /// Every provider in the fallback chain gets the attempt timeout; the call
    /// as a whole gets one attempt timeout per allowed retry.
    ///
    /// Returns `None` for any failure: transport, timeout, exhausted providers,
    /// or a payload with no extractable tasks.
    async fn attempt(&self, run: &mut SplitRun<'_>, prompt: &str, label: &str) -> Option<Vec<Task>> {
        if run.attempts > 0 {
            let backoff = self.config.backoff(run.attempts - 1);
            let remaining = run.deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(backoff.min(remaining)).await;
        }
        run.attempts += 1;

        let remaining = run.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!(%label, "attempt: overall deadline passed, skipping provider call");
            return None;
        }
        let timeout = self
            .call_options
            .chain_budget()
            .unwrap_or_else(|| self.config.attempt_timeout())
            .min(remaining);

        let result = match tokio::time::timeout(timeout, self.orchestrator.call_multi(prompt, &self.call_options)).await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(%label, error = %e, "attempt: providers failed");
                return None;
            }
            Err(_) => {
                warn!(%label, timeout_ms = duration_ms(timeout), "attempt: timed out");
                return None;
            }
        };

        match parse_tasks(&result.result, run.description) {
            ParseOutcome::Tasks(tasks) => {
                debug!(%label, provider = %result.provider, count = tasks.len(), "attempt: parsed tasks");
                Some(tasks)
            }
            ParseOutcome::Failure => {
                warn!(%label, provider = %result.provider, "attempt: no tasks in provider answer");
                None
            }
        }
    }
}

impl SplitState {
    fn name(&self) -> &'static str {
        match self {
            Self::TryPrimary => "try-primary",
            Self::TryJsonOnly => "try-json-only",
            Self::TryStrict => "try-strict",
            Self::Expand(_) => "expand",
            Self::Heuristic => "heuristic",
            Self::Done(_) => "done",
        }
    }
}

/// Whether a task title just repeats the goal
///
/// Equality always counts. `echo_substring` adds a title contained in the
/// description, `echo_wrapped` a title that contains the whole description.
/// Comparison is case-insensitive.
pub fn is_echo(title: &str, description: &str, config: &SplitterConfig) -> bool {
    let title = title.trim().to_lowercase();
    let description = description.trim().to_lowercase();
    if title.is_empty() {
        return false;
    }
    title == description
        || (config.echo_substring && description.contains(&title))
        || (config.echo_wrapped && title.contains(&description))
}

/// Clamp titles, drop blank ones and put every estimate in the urgency unit
fn finalize(tasks: Vec<Task>, urgent: bool) -> Vec<Task> {
    let tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|t| !t.title.trim().is_empty())
        .map(|mut t| {
            t.clamp_title(MAX_GENERATED_TITLE_CHARS);
            t.apply_urgency(urgent);
            t
        })
        .collect();
    info!(count = tasks.len(), urgent, "finalize: plan ready");
    tasks
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
