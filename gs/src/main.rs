//! goalsplit - goal decomposition CLI
//!
//! Entry point for splitting goals into tasks and suggesting habits.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use goalsplit::cli::{Cli, Command, OutputFormat, get_log_path};
use goalsplit::config::Config;
use goalsplit::domain::{Difficulty, Goal, GoalContext, HabitSuggestion, SplitOptions, Task, Tempo};
use goalsplit::habits::HabitSuggester;
use goalsplit::provider::ProviderOrchestrator;
use goalsplit::splitter::GoalSplitter;

fn parse_level(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> tracing::Level {
    // Priority: CLI --log-level > config file > default (INFO)
    match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn open_log_file() -> Result<fs::File> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }
    fs::File::create(&log_path).context("Failed to create log file")
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) {
    // Note: Can't log params here since logging isn't initialized yet
    let level = parse_level(cli_log_level, config_log_level);
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    match open_log_file() {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init(),
        Err(e) => {
            eprintln!("Warning: {:#}, logging to stderr", e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init()
        }
    }

    info!("Logging initialized (level: {:?})", level);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref());

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let mock = cli.mock || config.mock_enabled();
    let orchestrator =
        Arc::new(ProviderOrchestrator::from_config(&config.providers, mock).context("Failed to set up providers")?);
    info!(mock, "goalsplit loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Split {
            description,
            tempo,
            force_daily,
            target_date,
            baseline,
            unit,
            frequency,
            constraints,
            raw,
            tags,
            difficulty,
            deadline,
            format,
        } => {
            let options = SplitOptions {
                baseline,
                unit,
                frequency,
                constraints,
                target_date,
                force_daily,
                tempo,
            };
            let context = GoalContext {
                goal: description.clone(),
                tags,
                deadline,
                preferred_difficulty: difficulty,
                ..Default::default()
            };
            cmd_split(&config, orchestrator, &description, &options, (!raw).then_some(&context), format).await
        }
        Command::Habits {
            goal_id,
            title,
            description,
            existing,
            format,
        } => {
            let mut goal = Goal::new(goal_id, title);
            goal.description = description;
            cmd_habits(&config, orchestrator, &goal, &existing, format).await
        }
        Command::Providers => cmd_providers(&config, &orchestrator),
    }
}

async fn cmd_split(
    config: &Config,
    orchestrator: Arc<ProviderOrchestrator>,
    description: &str,
    options: &SplitOptions,
    context: Option<&GoalContext>,
    format: OutputFormat,
) -> Result<()> {
    debug!(postprocess = context.is_some(), ?format, "cmd_split: called");
    let splitter = GoalSplitter::new(orchestrator, config.splitter.clone());

    let tasks = match context {
        Some(context) => splitter.split_and_postprocess(description, options, Some(context)).await,
        None => splitter.split(description, options).await,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
        OutputFormat::Text => print_tasks(&tasks, options.tempo),
    }
    Ok(())
}

fn print_tasks(tasks: &[Task], tempo: Tempo) {
    if tasks.is_empty() {
        println!("{}", "Nothing to split: the goal is blank".yellow());
        return;
    }

    println!("{} {} tasks (tempo: {})", "✓".green(), tasks.len(), tempo);
    for (i, task) in tasks.iter().enumerate() {
        let estimate = match (task.week_estimate(), task.day_estimate()) {
            (Some(w), _) => format!("{}w", w),
            (None, Some(d)) => format!("{}d", d),
            (None, None) => "-".to_string(),
        };
        let priority = task.priority.map(|p| p.to_string()).unwrap_or_default();
        println!(
            "{:>3}. {} {} {}",
            i + 1,
            task.title.bold(),
            estimate.cyan(),
            priority.dimmed()
        );
        if let Some(description) = &task.description {
            println!("     {}", description);
        }
        if let Some(criteria) = &task.acceptance_criteria {
            println!("     {} {}", "done when:".dimmed(), criteria);
        }
    }
}

async fn cmd_habits(
    config: &Config,
    orchestrator: Arc<ProviderOrchestrator>,
    goal: &Goal,
    existing: &[String],
    format: OutputFormat,
) -> Result<()> {
    debug!(goal_id = %goal.id, ?format, "cmd_habits: called");
    let suggester = HabitSuggester::new(orchestrator, config.splitter.attempt_timeout());
    let habits = suggester.suggest(goal, existing).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&habits)?),
        OutputFormat::Text => print_habits(&habits),
    }
    Ok(())
}

fn print_habits(habits: &[HabitSuggestion]) {
    for habit in habits {
        let difficulty = match habit.difficulty {
            Difficulty::Easy => "easy".green(),
            Difficulty::Medium => "medium".yellow(),
            Difficulty::Hard => "hard".red(),
        };
        println!(
            "{} {} [{}, {}] {:.2}",
            "•".cyan(),
            habit.title.bold(),
            habit.frequency,
            difficulty,
            habit.confidence
        );
        if let Some(description) = &habit.description {
            println!("  {}", description.dimmed());
        }
    }
}

fn cmd_providers(config: &Config, orchestrator: &ProviderOrchestrator) -> Result<()> {
    debug!("cmd_providers: called");
    let preferred = orchestrator.defaults().preferred_provider.as_deref();
    let ordered = orchestrator.registry().ordered(preferred);

    println!("Provider order (max retries: {}):", config.providers.max_retries);
    for (i, provider) in ordered.iter().enumerate() {
        let marker = if Some(provider.id.as_str()) == preferred {
            " (preferred)".cyan().to_string()
        } else {
            String::new()
        };
        println!("{:>3}. {} priority={}{}", i + 1, provider.id.green(), provider.priority, marker);
    }

    for provider in orchestrator.registry().entries().iter().filter(|p| !p.enabled) {
        println!("   - {} {}", provider.id.dimmed(), "(disabled)".red());
    }

    if ordered.is_empty() {
        println!("{}", "No enabled providers".yellow());
    }
    Ok(())
}
