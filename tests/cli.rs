use chrono::{DateTime, Local, TimeZone};
use std::rc::Rc;
use tasktrack::cli::{CliError, Commands, FilterAction, run_command};
use tasktrack::form::FormError;
use tasktrack::{DateRange, MemoryStorage, Priority, StatusFilter, Tracker};

fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap()
}

fn run(tracker: &mut Tracker, command: Commands) -> Result<String, CliError> {
    let mut out = Vec::new();
    run_command(command, tracker, &now(), &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

fn add(tracker: &mut Tracker, title: &str, due: &str, priority: &str, tags: Option<&str>) -> String {
    run(
        tracker,
        Commands::Add {
            title: title.to_string(),
            due: due.to_string(),
            priority: priority.to_string(),
            tags: tags.map(str::to_string),
        },
    )
    .unwrap()
}

fn id_prefix(tracker: &Tracker, index: usize) -> String {
    tracker.tasks.tasks()[index].id.to_string()[..8].to_string()
}

fn fresh_tracker() -> Tracker {
    Tracker::load(Rc::new(MemoryStorage::new()))
}

#[test]
fn add_then_list() {
    let mut tracker = fresh_tracker();
    let output = add(&mut tracker, "Buy milk", "2024-05-15", "low", Some("home, errands"));
    assert!(output.starts_with("Task created successfully (ID: "));

    let listing = run(&mut tracker, Commands::List { all: false }).unwrap();
    assert!(listing.contains("[ ]"));
    assert!(listing.contains("Buy milk"));
    assert!(listing.contains("(low, due 2024-05-15)"));
    assert!(listing.contains("#home #errands"));
}

#[test]
fn add_rejects_invalid_forms() {
    let mut tracker = fresh_tracker();
    let short = run(
        &mut tracker,
        Commands::Add {
            title: "ab".to_string(),
            due: "2024-05-20".to_string(),
            priority: "low".to_string(),
            tags: None,
        },
    );
    assert!(matches!(short, Err(CliError::FormError(FormError::TitleTooShort))));

    let past = run(
        &mut tracker,
        Commands::Add {
            title: "Too late".to_string(),
            due: "2024-05-14".to_string(),
            priority: "low".to_string(),
            tags: None,
        },
    );
    assert!(matches!(past, Err(CliError::FormError(FormError::DueDateInPast(_)))));

    let priority = run(
        &mut tracker,
        Commands::Add {
            title: "Bad priority".to_string(),
            due: "2024-05-20".to_string(),
            priority: "urgent".to_string(),
            tags: None,
        },
    );
    assert!(matches!(priority, Err(CliError::FormError(FormError::InvalidPriority(_)))));
    assert!(tracker.tasks.is_empty());
}

#[test]
fn toggle_and_remove_by_prefix() {
    let mut tracker = fresh_tracker();
    add(&mut tracker, "Walk dog", "2024-05-16", "medium", None);
    let prefix = id_prefix(&tracker, 0);

    let toggled = run(&mut tracker, Commands::Toggle { id: prefix.to_uppercase() }).unwrap();
    assert!(toggled.contains("marked completed"));
    assert!(tracker.tasks.tasks()[0].completed);

    let removed = run(&mut tracker, Commands::Remove { id: prefix }).unwrap();
    assert!(removed.starts_with("Task deleted"));
    assert!(tracker.tasks.is_empty());
}

#[test]
fn unknown_id_is_reported() {
    let mut tracker = fresh_tracker();
    add(&mut tracker, "Walk dog", "2024-05-16", "medium", None);

    let result = run(&mut tracker, Commands::Toggle { id: "zzzz".to_string() });
    assert!(matches!(result, Err(CliError::TaskNotFound(_))));
    assert!(!tracker.tasks.tasks()[0].completed);
}

#[test]
fn edit_changes_only_given_fields() {
    let mut tracker = fresh_tracker();
    add(&mut tracker, "Draft report", "2024-05-20", "low", Some("work"));
    let prefix = id_prefix(&tracker, 0);
    let before = tracker.tasks.tasks()[0].clone();

    run(
        &mut tracker,
        Commands::Edit {
            id: prefix,
            title: Some("Final report".to_string()),
            due: None,
            priority: Some("high".to_string()),
            tags: None,
        },
    )
    .unwrap();

    let after = &tracker.tasks.tasks()[0];
    assert_eq!(after.id, before.id);
    assert_eq!(after.title, "Final report");
    assert_eq!(after.priority, Priority::High);
    assert_eq!(after.due_date, before.due_date);
    assert_eq!(after.tags, before.tags);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn filters_persist_between_commands() {
    let mut tracker = fresh_tracker();
    add(&mut tracker, "Today task", "2024-05-15", "high", Some("work"));
    add(&mut tracker, "Later task", "2024-05-30", "low", Some("home"));

    let summary = run(
        &mut tracker,
        Commands::Filter {
            action: FilterAction::Date { range: DateRange::Today },
        },
    )
    .unwrap();
    assert!(summary.contains("Date: Today"));

    let listing = run(&mut tracker, Commands::List { all: false }).unwrap();
    assert!(listing.starts_with("Filters: "));
    assert!(listing.contains("Today task"));
    assert!(!listing.contains("Later task"));

    let everything = run(&mut tracker, Commands::List { all: true }).unwrap();
    assert!(everything.contains("Later task"));

    run(
        &mut tracker,
        Commands::Filter {
            action: FilterAction::Status { status: StatusFilter::Completed },
        },
    )
    .unwrap();
    let empty = run(&mut tracker, Commands::List { all: false }).unwrap();
    assert!(empty.ends_with("No tasks\n"));

    let reset = run(&mut tracker, Commands::Filter { action: FilterAction::Reset }).unwrap();
    assert_eq!(reset, "No filters\n");
    assert!(tracker.criteria().is_default());
}

#[test]
fn tag_filter_and_tag_listing() {
    let mut tracker = fresh_tracker();
    add(&mut tracker, "Work task", "2024-05-20", "low", Some("work, urgent"));
    add(&mut tracker, "Home task", "2024-05-20", "low", Some("home"));

    let tags = run(&mut tracker, Commands::Tags).unwrap();
    assert_eq!(tags, "work\nurgent\nhome\n");

    run(
        &mut tracker,
        Commands::Filter {
            action: FilterAction::Tags { tags: vec!["urgent".to_string()] },
        },
    )
    .unwrap();
    let listing = run(&mut tracker, Commands::List { all: false }).unwrap();
    assert!(listing.contains("Work task"));
    assert!(!listing.contains("Home task"));
}

#[test]
fn empty_store_prints_placeholders() {
    let mut tracker = fresh_tracker();
    assert_eq!(run(&mut tracker, Commands::List { all: false }).unwrap(), "No tasks\n");
    assert_eq!(run(&mut tracker, Commands::Tags).unwrap(), "No tags\n");
}
