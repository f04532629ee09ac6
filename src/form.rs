use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use thiserror::Error;

use crate::models::{Priority, Task, TaskId};
use crate::utils::parse_date;

/// Minimum title length, in characters, accepted by the form
pub const MIN_TITLE_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be at least 3 characters")]
    TitleTooShort,
    #[error("Due date is required")]
    DueDateRequired,
    #[error("Due date must be in YYYY-MM-DD format: '{0}'")]
    InvalidDueDate(String),
    #[error("Due date {0} is in the past")]
    DueDateInPast(NaiveDate),
    #[error("Priority is required")]
    PriorityRequired,
    #[error("Priority must be low, medium or high: '{0}'")]
    InvalidPriority(String),
}

/// Field values exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTaskForm {
    pub title: String,
    pub due_date: String,
    pub priority: String,
    pub tags: String,
}

/// Validated form values, ready for `map_form`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFormInput {
    pub title: String,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub tags: Option<Vec<String>>,
}

/// Whether the form creates a new task or edits `prior`
#[derive(Debug, Clone, Copy)]
pub enum FormMode<'a> {
    Create,
    Edit(&'a Task),
}

impl RawTaskForm {
    /// Prefill from an existing task, showing the due date as a local calendar day
    pub fn from_task<Tz: TimeZone>(task: &Task, tz: &Tz) -> Self {
        Self {
            title: task.title.clone(),
            due_date: task.due_date.with_timezone(tz).date_naive().format("%Y-%m-%d").to_string(),
            priority: task.priority.to_string(),
            tags: task.tags.join(", "),
        }
    }

    /// Check the typed values. The title is trimmed before its length is checked.
    ///
    /// Due dates before `today` are rejected, except `current_due` (the date the
    /// edited task already has), so an overdue task can still be edited.
    pub fn validate(&self, today: NaiveDate, current_due: Option<NaiveDate>) -> Result<TaskFormInput, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::TitleRequired);
        }
        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(FormError::TitleTooShort);
        }

        let due = self.due_date.trim();
        if due.is_empty() {
            return Err(FormError::DueDateRequired);
        }
        let due_date = parse_date(due).map_err(|_| FormError::InvalidDueDate(due.to_string()))?;
        if due_date < today && Some(due_date) != current_due {
            return Err(FormError::DueDateInPast(due_date));
        }

        let priority = self.priority.trim();
        if priority.is_empty() {
            return Err(FormError::PriorityRequired);
        }
        let priority = priority
            .parse::<Priority>()
            .map_err(|_| FormError::InvalidPriority(priority.to_string()))?;

        let tags = parse_tags(&self.tags);
        Ok(TaskFormInput {
            title: title.to_string(),
            due_date,
            priority,
            tags: if tags.is_empty() { None } else { Some(tags) },
        })
    }
}

/// Build the task a submitted form describes.
///
/// Create mode assigns a fresh id, `created_at = now` and `completed = false`.
/// Edit mode keeps id, creation time and completion of the prior task.
/// The due day becomes the last second of that day in `now`'s time zone.
pub fn map_form<Tz: TimeZone>(input: TaskFormInput, mode: FormMode<'_>, now: &DateTime<Tz>) -> Task {
    let (id, created_at, completed) = match mode {
        FormMode::Create => (TaskId::new(), now.with_timezone(&Utc), false),
        FormMode::Edit(prior) => (prior.id, prior.created_at, prior.completed),
    };

    Task {
        id,
        title: input.title,
        completed,
        due_date: end_of_day(input.due_date, &now.timezone()),
        priority: input.priority,
        tags: input.tags.unwrap_or_default(),
        created_at,
    }
}

/// Parse tags from a comma-separated string: trimmed, blanks dropped, first occurrence kept
pub fn parse_tags(tags: &str) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !parsed.iter().any(|t| t == tag) {
            parsed.push(tag.to_string());
        }
    }
    parsed
}

/// 23:59:59 local time on `date`, as UTC
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) + TimeDelta::days(1) - TimeDelta::seconds(1);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
