//! goalsplit - goal decomposition and task validation
//!
//! Turns a free-text goal into an ordered list of concrete, checkable tasks
//! and suggests supporting habits. Text-generation providers are treated as
//! unreliable: answers are parsed tolerantly, failures escalate through
//! stricter prompts, and total provider failure still yields a useful local
//! plan.
//!
//! # Modules
//!
//! - [`provider`] - provider trait, HTTP and mock clients, registry, orchestrator
//! - [`parser`] - tolerant payload to task conversion
//! - [`heuristic`] - deterministic offline plans per goal domain
//! - [`expander`] - grow a short task list without a provider
//! - [`postprocess`] - validation, dedup, enrichment, prioritization
//! - [`splitter`] - the goal decomposition state machine
//! - [`habits`] - habit suggestions for a goal
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod expander;
pub mod habits;
pub mod heuristic;
pub mod parser;
pub mod postprocess;
pub mod provider;
pub mod splitter;

// Re-export commonly used types
pub use config::{Config, ProviderEntry, ProvidersConfig, SplitterConfig};
pub use domain::{
    Difficulty, Estimate, Frequency, Goal, GoalContext, HabitSource, HabitStatus, HabitSuggestion, Priority,
    SplitOptions, Task, Tempo,
};
pub use expander::expand_tasks;
pub use habits::HabitSuggester;
pub use heuristic::{Domain, classify_domain, heuristic_tasks};
pub use parser::{ParseOutcome, parse_tasks};
pub use postprocess::{ValidationIssue, postprocess_tasks, validate_task_structure};
pub use provider::{
    CallOptions, HttpProvider, MockProvider, MockResponse, ProviderClient, ProviderConfig, ProviderError,
    ProviderOrchestrator, ProviderRegistry, ProviderResult, RawPayload,
};
pub use splitter::{GoalSplitter, classify_urgency, desired_min_count};
