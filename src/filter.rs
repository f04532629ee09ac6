use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::models::{ParseEnumError, Priority, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Uncompleted,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [StatusFilter::All, StatusFilter::Completed, StatusFilter::Uncompleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Completed => "completed",
            StatusFilter::Uncompleted => "uncompleted",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Completed => "Completed",
            StatusFilter::Uncompleted => "Uncompleted",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        cycle_in(&Self::ALL, self, forward)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "uncompleted" | "todo" | "active" => Ok(StatusFilter::Uncompleted),
            _ => Err(ParseEnumError::new("status", s, "all, completed, uncompleted")),
        }
    }
}

/// Due-date bucket, always relative to the evaluation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
    Overdue,
}

impl DateRange {
    pub const ALL: [DateRange; 5] = [
        DateRange::All,
        DateRange::Today,
        DateRange::Week,
        DateRange::Month,
        DateRange::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::All => "all",
            DateRange::Today => "today",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::Overdue => "overdue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::All => "All dates",
            DateRange::Today => "Today",
            DateRange::Week => "This week",
            DateRange::Month => "This month",
            DateRange::Overdue => "Overdue",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        cycle_in(&Self::ALL, self, forward)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(DateRange::All),
            "today" => Ok(DateRange::Today),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            "overdue" => Ok(DateRange::Overdue),
            _ => Err(ParseEnumError::new("date range", s, "all, today, week, month, overdue")),
        }
    }
}

fn cycle_in<T: Copy + PartialEq>(values: &[T], current: T, forward: bool) -> T {
    let len = values.len();
    let index = values.iter().position(|v| *v == current).unwrap_or(0);
    let next = if forward { (index + 1) % len } else { (index + len - 1) % len };
    values[next]
}

/// The active filter criteria. The default value imposes no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub priority: BTreeSet<Priority>,
    pub date_range: DateRange,
    pub search: String,
    pub tags: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn is_default(&self) -> bool {
        *self == FilterCriteria::default()
    }

    /// One-line description of the active criteria, "No filters" when none apply
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.status != StatusFilter::All {
            parts.push(format!("Status: {}", self.status.label()));
        }

        if !self.priority.is_empty() {
            let priorities: Vec<&str> = self.priority.iter().map(|p| p.as_str()).collect();
            parts.push(format!("Priority: {}", priorities.join(", ")));
        }

        if self.date_range != DateRange::All {
            parts.push(format!("Date: {}", self.date_range.label()));
        }

        if !self.tags.is_empty() {
            let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
            parts.push(format!("Tags: {}", tags.join(", ")));
        }

        let search = self.search.trim();
        if !search.is_empty() {
            parts.push(format!("Search: \"{}\"", search));
        }

        if parts.is_empty() {
            "No filters".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// Decide whether `task` passes every active criterion at time `now`.
///
/// Calendar comparisons (today, week, month, overdue) happen in `now`'s time zone.
/// Week and month bounds are exclusive instants: a due date exactly at the
/// first instant of the period, or at its last millisecond, is outside it.
/// Weeks start on Sunday.
pub fn included<Tz: TimeZone>(task: &Task, criteria: &FilterCriteria, now: &DateTime<Tz>) -> bool {
    match criteria.status {
        StatusFilter::Completed if !task.completed => return false,
        StatusFilter::Uncompleted if task.completed => return false,
        _ => {}
    }

    if !criteria.priority.is_empty() && !criteria.priority.contains(&task.priority) {
        return false;
    }

    if !in_date_range(task, criteria.date_range, now) {
        return false;
    }

    if !criteria.tags.is_empty() && !task.tags.iter().any(|tag| criteria.tags.contains(tag)) {
        return false;
    }

    matches_search(&task.title, &criteria.search)
}

/// The ordered sub-sequence of `tasks` passing `criteria`
pub fn visible<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    criteria: &FilterCriteria,
    now: &DateTime<Tz>,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| included(task, criteria, now))
        .collect()
}

fn matches_search(title: &str, search: &str) -> bool {
    let needle = search.trim();
    if needle.is_empty() {
        return true;
    }
    title.to_lowercase().contains(&needle.to_lowercase())
}

fn in_date_range<Tz: TimeZone>(task: &Task, range: DateRange, now: &DateTime<Tz>) -> bool {
    let due = task.due_date.with_timezone(&now.timezone()).naive_local();
    let today = now.date_naive();

    match range {
        DateRange::All => true,
        DateRange::Today => due.date() == today,
        DateRange::Overdue => due.date() < today,
        DateRange::Week => week_bounds(today).is_some_and(|(start, end)| due > start && due < end),
        DateRange::Month => month_bounds(today).is_some_and(|(start, end)| due > start && due < end),
    }
}

/// First instant of the Sunday-based week containing `day`, and its last millisecond
fn week_bounds(day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    let first = day.checked_sub_days(Days::new(offset))?;
    let next = first.checked_add_days(Days::new(7))?;
    Some(period(first, next))
}

/// First instant of the month containing `day`, and its last millisecond
fn month_bounds(day: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = day.checked_sub_days(Days::new(u64::from(day.day0())))?;
    let next = first.checked_add_months(Months::new(1))?;
    Some(period(first, next))
}

fn period(first: NaiveDate, next: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = first.and_time(NaiveTime::MIN);
    let end = next.and_time(NaiveTime::MIN) - TimeDelta::milliseconds(1);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn task(title: &str, due: DateTime<Utc>) -> Task {
        Task::new(title.to_string(), due, Priority::Medium, at(2024, 1, 1, 0, 0))
    }

    // Wednesday
    fn now() -> DateTime<Utc> {
        at(2024, 5, 15, 12, 0)
    }

    fn with_range(range: DateRange) -> FilterCriteria {
        FilterCriteria {
            date_range: range,
            ..Default::default()
        }
    }

    #[test]
    fn default_criteria_include_everything() {
        let mut done = task("Done thing", at(2020, 1, 1, 0, 0));
        done.completed = true;
        done.tags = vec!["x".to_string()];
        let open = task("Open thing", at(2030, 1, 1, 0, 0));

        let criteria = FilterCriteria::default();
        assert!(criteria.is_default());
        assert!(included(&done, &criteria, &now()));
        assert!(included(&open, &criteria, &now()));
    }

    #[test]
    fn status_filter() {
        let mut t = task("Write report", now());
        let completed = FilterCriteria {
            status: StatusFilter::Completed,
            ..Default::default()
        };
        let uncompleted = FilterCriteria {
            status: StatusFilter::Uncompleted,
            ..Default::default()
        };

        assert!(!included(&t, &completed, &now()));
        assert!(included(&t, &uncompleted, &now()));
        t.completed = true;
        assert!(included(&t, &completed, &now()));
        assert!(!included(&t, &uncompleted, &now()));
    }

    #[test]
    fn priority_set_membership() {
        let t = task("Call mom", now());
        let mut criteria = FilterCriteria::default();
        criteria.priority.insert(Priority::High);
        assert!(!included(&t, &criteria, &now()));
        criteria.priority.insert(Priority::Medium);
        assert!(included(&t, &criteria, &now()));
    }

    #[test]
    fn today_uses_calendar_day() {
        let criteria = with_range(DateRange::Today);
        assert!(included(&task("a", at(2024, 5, 15, 0, 0)), &criteria, &now()));
        assert!(included(&task("b", at(2024, 5, 15, 23, 59)), &criteria, &now()));
        assert!(!included(&task("c", at(2024, 5, 16, 0, 0)), &criteria, &now()));
        assert!(!included(&task("d", at(2024, 5, 14, 23, 59)), &criteria, &now()));
    }

    #[test]
    fn overdue_excludes_same_day() {
        let criteria = with_range(DateRange::Overdue);
        assert!(included(&task("yesterday", at(2024, 5, 14, 23, 0)), &criteria, &now()));
        assert!(!included(&task("this morning", at(2024, 5, 15, 1, 0)), &criteria, &now()));
        assert!(!included(&task("tomorrow", at(2024, 5, 16, 9, 0)), &criteria, &now()));
    }

    #[test]
    fn week_bounds_are_exclusive_instants() {
        let criteria = with_range(DateRange::Week);
        // week of Sunday 2024-05-12 .. Saturday 2024-05-18
        assert!(!included(&task("start instant", at(2024, 5, 12, 0, 0)), &criteria, &now()));
        assert!(included(&task("sunday noon", at(2024, 5, 12, 12, 0)), &criteria, &now()));
        assert!(included(&task("saturday evening", at(2024, 5, 18, 23, 59)), &criteria, &now()));
        assert!(!included(&task("next sunday", at(2024, 5, 19, 0, 0)), &criteria, &now()));
        assert!(!included(&task("last saturday", at(2024, 5, 11, 18, 0)), &criteria, &now()));
    }

    #[test]
    fn month_bounds_are_exclusive_instants() {
        let criteria = with_range(DateRange::Month);
        assert!(!included(&task("first instant", at(2024, 5, 1, 0, 0)), &criteria, &now()));
        assert!(included(&task("first day", at(2024, 5, 1, 8, 0)), &criteria, &now()));
        assert!(included(&task("last day", at(2024, 5, 31, 23, 59)), &criteria, &now()));
        assert!(!included(&task("june", at(2024, 6, 1, 0, 0)), &criteria, &now()));
        assert!(!included(&task("april", at(2024, 4, 30, 12, 0)), &criteria, &now()));
    }

    #[test]
    fn calendar_day_follows_now_time_zone() {
        // 23:30 UTC on the 14th is already the 15th at UTC+02:00
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_now = tz.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap();
        let t = task("late night", at(2024, 5, 14, 23, 30));

        assert!(included(&t, &with_range(DateRange::Today), &local_now));
        assert!(!included(&t, &with_range(DateRange::Overdue), &local_now));
    }

    #[test]
    fn tags_need_any_overlap() {
        let mut t = task("Prepare slides", now());
        let mut criteria = FilterCriteria::default();
        criteria.tags.insert("work".to_string());
        assert!(!included(&t, &criteria, &now()), "untagged task fails a tag filter");

        t.tags = vec!["home".to_string(), "work".to_string()];
        assert!(included(&t, &criteria, &now()));
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let t = task("Buy Milk", now());
        let mut criteria = FilterCriteria::default();
        criteria.search = "  mIL ".to_string();
        assert!(included(&t, &criteria, &now()));
        criteria.search = "bread".to_string();
        assert!(!included(&t, &criteria, &now()));
        criteria.search = "   ".to_string();
        assert!(included(&t, &criteria, &now()));
    }

    #[test]
    fn visible_preserves_insertion_order() {
        let tasks = vec![
            task("alpha report", now()),
            task("beta", now()),
            task("gamma report", now()),
        ];
        let criteria = FilterCriteria {
            search: "report".to_string(),
            ..Default::default()
        };
        let titles: Vec<&str> = visible(&tasks, &criteria, &now())
            .into_iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["alpha report", "gamma report"]);
    }

    #[test]
    fn summary_lists_active_criteria() {
        assert_eq!(FilterCriteria::default().summary(), "No filters");

        let mut criteria = FilterCriteria {
            status: StatusFilter::Completed,
            date_range: DateRange::Overdue,
            search: "mil".to_string(),
            ..Default::default()
        };
        criteria.priority.insert(Priority::High);
        criteria.tags.insert("work".to_string());
        assert_eq!(
            criteria.summary(),
            "Status: Completed | Priority: high | Date: Overdue | Tags: work | Search: \"mil\""
        );
    }

    #[test]
    fn enums_cycle_and_parse() {
        assert_eq!(DateRange::Overdue.cycle(true), DateRange::All);
        assert_eq!(DateRange::All.cycle(false), DateRange::Overdue);
        assert_eq!(StatusFilter::All.cycle(true), StatusFilter::Completed);
        assert_eq!("todo".parse::<StatusFilter>().unwrap(), StatusFilter::Uncompleted);
        assert_eq!("Week".parse::<DateRange>().unwrap(), DateRange::Week);
        assert!("fortnight".parse::<DateRange>().is_err());
    }
}
