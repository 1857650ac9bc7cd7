//! Domain types for goalsplit
//!
//! Value objects that flow through the pipeline: tasks, goals, splitting
//! options, postprocessing context and habit suggestions. Nothing here is
//! persisted by this crate.

mod goal;
mod habit;
mod priority;
mod task;

pub use goal::{Goal, GoalContext, SplitOptions};
pub use habit::{DEFAULT_CONFIDENCE, Frequency, HabitSource, HabitStatus, HabitSuggestion};
pub use priority::{Difficulty, Priority, Tempo};
pub use task::{Estimate, MAX_GENERATED_TITLE_CHARS, Task, split_title};
