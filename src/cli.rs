use chrono::{DateTime, Local, TimeZone};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::Write;
use thiserror::Error;

use crate::filter::{DateRange, StatusFilter};
use crate::form::{self, FormError, FormMode, RawTaskForm};
use crate::models::{Priority, Task, TaskId};
use crate::storage::StorageError;
use crate::tracker::Tracker;

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "Personal task tracker with persisted filters")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a new task
    Add {
        /// Task title (at least 3 characters)
        title: String,
        /// Due date (YYYY-MM-DD), today or later
        #[arg(long)]
        due: String,
        /// low, medium or high
        #[arg(long)]
        priority: String,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Edit an existing task; omitted fields keep their value
    Edit {
        /// Task id or a unique prefix of it
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        /// Comma-separated tags; an empty string clears them
        #[arg(long)]
        tags: Option<String>,
    },
    /// Flip a task between completed and not completed
    Toggle {
        /// Task id or a unique prefix of it
        id: String,
    },
    /// Delete a task
    Remove {
        /// Task id or a unique prefix of it
        id: String,
    },
    /// List tasks passing the saved filters
    List {
        /// Ignore the saved filters
        #[arg(long)]
        all: bool,
    },
    /// List every tag in use
    Tags,
    /// Show or change the saved filters
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },
}

#[derive(Subcommand)]
pub enum FilterAction {
    /// Print the active filters
    Show,
    /// all, completed or uncompleted
    Status { status: StatusFilter },
    /// Keep only these priorities; none clears the restriction
    Priority { priorities: Vec<Priority> },
    /// all, today, week, month or overdue
    Date { range: DateRange },
    /// Case-insensitive title search; omit to clear
    Search { text: Option<String> },
    /// Keep tasks carrying any of these tags; none clears the restriction
    Tags { tags: Vec<String> },
    /// Clear every filter
    Reset,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("Invalid task: {0}")]
    FormError(#[from] FormError),
    #[error("No task matches id '{0}'")]
    TaskNotFound(String),
    #[error("Id '{0}' matches {1} tasks; use a longer prefix")]
    AmbiguousId(String, usize),
    #[error("Failed to write output: {0}")]
    OutputError(#[from] std::io::Error),
}

/// Run a non-interactive command against `tracker`, writing results to `out`
pub fn run_command<W: Write>(
    command: Commands,
    tracker: &mut Tracker,
    now: &DateTime<Local>,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        // Launched by the binary before reaching here
        Commands::Tui => Ok(()),
        Commands::Add { title, due, priority, tags } => {
            handle_add(RawTaskForm { title, due_date: due, priority, tags: tags.unwrap_or_default() }, tracker, now, out)
        }
        Commands::Edit { id, title, due, priority, tags } => {
            handle_edit(&id, EditArgs { title, due, priority, tags }, tracker, now, out)
        }
        Commands::Toggle { id } => handle_toggle(&id, tracker, out),
        Commands::Remove { id } => handle_remove(&id, tracker, out),
        Commands::List { all } => handle_list(all, tracker, now, out),
        Commands::Tags => handle_tags(tracker, out),
        Commands::Filter { action } => handle_filter(action, tracker, out),
    }
}

/// Handle the add command
pub fn handle_add<W: Write>(
    raw: RawTaskForm,
    tracker: &mut Tracker,
    now: &DateTime<Local>,
    out: &mut W,
) -> Result<(), CliError> {
    let input = raw.validate(now.date_naive(), None)?;
    let task = form::map_form(input, FormMode::Create, now);
    let id = task.id;
    tracker.tasks.add(task);
    writeln!(out, "Task created successfully (ID: {})", id)?;
    Ok(())
}

/// Fields given to the edit command; `None` keeps the current value
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub tags: Option<String>,
}

/// Handle the edit command
pub fn handle_edit<W: Write>(
    id: &str,
    args: EditArgs,
    tracker: &mut Tracker,
    now: &DateTime<Local>,
    out: &mut W,
) -> Result<(), CliError> {
    let id = resolve_id(tracker.tasks.tasks(), id)?;
    let Some(prior) = tracker.tasks.get(id) else {
        return Err(CliError::TaskNotFound(id.to_string()));
    };

    let tz = now.timezone();
    let mut raw = RawTaskForm::from_task(prior, &tz);
    if let Some(title) = args.title {
        raw.title = title;
    }
    if let Some(due) = args.due {
        raw.due_date = due;
    }
    if let Some(priority) = args.priority {
        raw.priority = priority;
    }
    if let Some(tags) = args.tags {
        raw.tags = tags;
    }

    let current_due = prior.due_date.with_timezone(&tz).date_naive();
    let input = raw.validate(now.date_naive(), Some(current_due))?;
    let task = form::map_form(input, FormMode::Edit(prior), now);
    tracker.tasks.update(task);
    writeln!(out, "Task updated (ID: {})", id)?;
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle<W: Write>(id: &str, tracker: &mut Tracker, out: &mut W) -> Result<(), CliError> {
    let id = resolve_id(tracker.tasks.tasks(), id)?;
    tracker.tasks.toggle_completed(id);
    let state = match tracker.tasks.get(id) {
        Some(task) if task.completed => "completed",
        _ => "not completed",
    };
    writeln!(out, "Task {} marked {}", id, state)?;
    Ok(())
}

/// Handle the remove command
pub fn handle_remove<W: Write>(id: &str, tracker: &mut Tracker, out: &mut W) -> Result<(), CliError> {
    let id = resolve_id(tracker.tasks.tasks(), id)?;
    tracker.tasks.remove(id);
    writeln!(out, "Task deleted (ID: {})", id)?;
    Ok(())
}

/// Handle the list command
pub fn handle_list<W: Write>(
    all: bool,
    tracker: &Tracker,
    now: &DateTime<Local>,
    out: &mut W,
) -> Result<(), CliError> {
    let tasks: Vec<&Task> = if all {
        tracker.tasks.tasks().iter().collect()
    } else {
        tracker.visible(now)
    };

    if !all && !tracker.criteria().is_default() {
        writeln!(out, "Filters: {}", tracker.criteria().summary())?;
    }
    if tasks.is_empty() {
        writeln!(out, "No tasks")?;
        return Ok(());
    }
    for task in tasks {
        writeln!(out, "{}", format_task_line(task, &now.timezone()))?;
    }
    Ok(())
}

/// Handle the tags command
pub fn handle_tags<W: Write>(tracker: &Tracker, out: &mut W) -> Result<(), CliError> {
    let tags = tracker.tasks.all_tags();
    if tags.is_empty() {
        writeln!(out, "No tags")?;
    }
    for tag in tags {
        writeln!(out, "{}", tag)?;
    }
    Ok(())
}

/// Handle the filter subcommands
pub fn handle_filter<W: Write>(action: FilterAction, tracker: &mut Tracker, out: &mut W) -> Result<(), CliError> {
    let filters = &mut tracker.filters;
    match action {
        FilterAction::Show => {}
        FilterAction::Status { status } => filters.set_status(status),
        FilterAction::Priority { priorities } => filters.set_priority(priorities.into_iter().collect()),
        FilterAction::Date { range } => filters.set_date_range(range),
        FilterAction::Search { text } => filters.set_search(text.unwrap_or_default()),
        FilterAction::Tags { tags } => {
            let tags: BTreeSet<String> = form::parse_tags(&tags.join(",")).into_iter().collect();
            filters.set_tags(tags);
        }
        FilterAction::Reset => filters.reset_filters(),
    }
    writeln!(out, "{}", filters.summary())?;
    Ok(())
}

/// Find the task whose id starts with `prefix` (case-insensitive)
pub fn resolve_id(tasks: &[Task], prefix: &str) -> Result<TaskId, CliError> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(CliError::TaskNotFound(prefix));
    }

    let matches: Vec<TaskId> = tasks
        .iter()
        .map(|t| t.id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(CliError::TaskNotFound(prefix)),
        many => Err(CliError::AmbiguousId(prefix, many.len())),
    }
}

/// One line per task: status box, short id, title, priority, local due day, tags
pub fn format_task_line<Tz: TimeZone>(task: &Task, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let check = if task.completed { "[x]" } else { "[ ]" };
    let short_id: String = task.id.to_string().chars().take(8).collect();
    let due = task.due_date.with_timezone(tz).format("%Y-%m-%d");
    let mut line = format!("{} {}  {}  ({}, due {})", check, short_id, task.title, task.priority, due);
    for tag in &task.tags {
        line.push_str(" #");
        line.push_str(tag);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(title: &str) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap();
        Task::new(title.to_string(), now, Priority::Low, now)
    }

    #[test]
    fn resolve_id_accepts_unique_prefixes() {
        let tasks = vec![task("one"), task("two")];
        let full = tasks[0].id.to_string();

        assert_eq!(resolve_id(&tasks, &full).unwrap(), tasks[0].id);
        assert_eq!(resolve_id(&tasks, &full.to_uppercase()).unwrap(), tasks[0].id);
        assert!(matches!(resolve_id(&tasks, ""), Err(CliError::TaskNotFound(_))));
        assert!(matches!(resolve_id(&tasks, "zz"), Err(CliError::TaskNotFound(_))));
    }

    #[test]
    fn task_line_shows_state_and_tags() {
        let mut t = task("Buy milk");
        t.completed = true;
        t.tags = vec!["shop".to_string()];
        let line = format_task_line(&t, &Utc);
        assert!(line.starts_with("[x] "));
        assert!(line.contains("Buy milk  (low, due 2024-05-15) #shop"));
    }

    #[test]
    fn cli_parses_filter_subcommands() {
        let cli = Cli::try_parse_from(["tasktrack", "filter", "priority", "high", "low"]).unwrap();
        match cli.command {
            Some(Commands::Filter { action: FilterAction::Priority { priorities } }) => {
                assert_eq!(priorities, vec![Priority::High, Priority::Low]);
            }
            _ => panic!("expected filter priority"),
        }
        assert!(Cli::try_parse_from(["tasktrack", "filter", "date", "fortnight"]).is_err());
    }
}
