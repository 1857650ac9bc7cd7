//! CLI command definitions and subcommands

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::{Difficulty, Tempo};

/// goalsplit - break goals into checkable tasks
#[derive(Parser, Debug)]
#[command(
    name = "gs",
    author,
    version,
    about = "Break a free-text goal into concrete, checkable tasks",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Use the deterministic mock provider instead of the network
    #[arg(long, global = true)]
    pub mock: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split a goal into tasks
    Split {
        /// Goal description
        description: String,

        /// Planning tempo (conservative, normal, aggressive)
        #[arg(short, long, default_value = "normal")]
        tempo: Tempo,

        /// Plan in days regardless of the text
        #[arg(long)]
        force_daily: bool,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<NaiveDate>,

        /// Current level, e.g. "run 2 km"
        #[arg(long)]
        baseline: Option<String>,

        /// Unit of measure for progress
        #[arg(long)]
        unit: Option<String>,

        /// How often the user can work on the goal
        #[arg(long)]
        frequency: Option<String>,

        /// Free-text constraints
        #[arg(long)]
        constraints: Option<String>,

        /// Skip validation, dedup and prioritization
        #[arg(long)]
        raw: bool,

        /// Goal tags, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Preferred difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Goal deadline used for prioritization (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Suggest supporting habits for a goal
    Habits {
        /// Goal ID the suggestions link to
        #[arg(long)]
        goal_id: String,

        /// Goal title
        #[arg(long)]
        title: String,

        /// Goal description
        #[arg(long)]
        description: Option<String>,

        /// Title of a habit the user already has (repeatable)
        #[arg(long = "existing")]
        existing: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective provider order
    Providers,
}

/// Output format for split/habits commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}

/// Where the binary writes its log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("goalsplit")
        .join("logs")
        .join("goalsplit.log")
}
