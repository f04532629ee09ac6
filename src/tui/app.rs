use chrono::Local;
use log::debug;
use ratatui::widgets::ListState;
use std::cell::Cell;
use std::cmp;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

use crate::Config;
use crate::config::KeyBindings;
use crate::form::{self, FormMode, RawTaskForm};
use crate::models::{Priority, Task, TaskId};
use crate::notify::SubscriptionId;
use crate::search::SearchBox;
use crate::tracker::Tracker;
use crate::tui::error::TuiError;
use crate::tui::widgets::editor::Editor;
use crate::utils::{ParsedKeyBinding, parse_key_binding};

const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Search,
    Form,
    Filter,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    DueDate,
    Priority,
    Tags,
}

impl FormField {
    const ORDER: [FormField; 4] = [FormField::Title, FormField::DueDate, FormField::Priority, FormField::Tags];

    fn next(self, forward: bool) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ORDER.len();
        Self::ORDER[if forward { (index + 1) % len } else { (index + len - 1) % len }]
    }
}

#[derive(Debug, Clone)]
pub struct TaskFormState {
    pub current_field: FormField,
    pub title: Editor,
    pub due_date: Editor,
    pub priority: Priority,
    pub tags: Editor,
    /// None when creating
    pub editing_task_id: Option<TaskId>,
    pub error: Option<String>,
}

impl TaskFormState {
    fn raw(&self) -> RawTaskForm {
        RawTaskForm {
            title: self.title.to_string(),
            due_date: self.due_date.to_string(),
            priority: self.priority.to_string(),
            tags: self.tags.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Status,
    Priority,
    DateRange,
    Tags,
}

impl FilterField {
    const ORDER: [FilterField; 4] = [FilterField::Status, FilterField::Priority, FilterField::DateRange, FilterField::Tags];

    fn next(self, forward: bool) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ORDER.len();
        Self::ORDER[if forward { (index + 1) % len } else { (index + len - 1) % len }]
    }
}

#[derive(Debug, Clone)]
pub struct FilterFormState {
    pub current_field: FilterField,
    pub priority_index: usize,
    pub tag_index: usize,
}

/// Parsed key bindings, validated once at startup
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub quit: ParsedKeyBinding,
    pub new: ParsedKeyBinding,
    pub edit: ParsedKeyBinding,
    pub save: ParsedKeyBinding,
    pub delete: ParsedKeyBinding,
    pub search: ParsedKeyBinding,
    pub filter: ParsedKeyBinding,
    pub reset_filters: ParsedKeyBinding,
    pub toggle_task_status: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
}

impl KeyMap {
    pub fn from_config(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |s: &str| parse_key_binding(s).map_err(TuiError::KeyBindingError);
        Ok(Self {
            quit: parse(&bindings.quit)?,
            new: parse(&bindings.new)?,
            edit: parse(&bindings.edit)?,
            save: parse(&bindings.save)?,
            delete: parse(&bindings.delete)?,
            search: parse(&bindings.search)?,
            filter: parse(&bindings.filter)?,
            reset_filters: parse(&bindings.reset_filters)?,
            toggle_task_status: parse(&bindings.toggle_task_status)?,
            list_up: parse(&bindings.list_up)?,
            list_down: parse(&bindings.list_down)?,
            help: parse(&bindings.help)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    pub selected_index: usize,
    pub selected_id: Option<TaskId>,
    pub list_state: ListState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            mode: Mode::View,
            selected_index: 0,
            selected_id: None,
            list_state: ListState::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<TaskId>,
    /// 0 = Delete, 1 = Cancel
    pub delete_modal_selection: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

struct Subscriptions {
    tasks: SubscriptionId,
    filters: SubscriptionId,
    changed: Rc<Cell<bool>>,
}

pub struct App {
    pub config: Config,
    pub keys: KeyMap,
    pub tracker: Tracker,

    pub ui: UiState,
    pub search: SearchBox,
    pub form: Option<TaskFormState>,
    pub filter_form: Option<FilterFormState>,
    pub modals: ModalState,
    pub status: StatusState,

    subscriptions: Subscriptions,
}

impl App {
    pub fn new(config: Config, mut tracker: Tracker) -> Result<Self, TuiError> {
        let keys = KeyMap::from_config(&config.key_bindings)?;

        // Store notifications only mark the view stale; the loop re-derives state on tick
        let changed = Rc::new(Cell::new(true));
        let tasks_flag = Rc::clone(&changed);
        let filters_flag = Rc::clone(&changed);
        let subscriptions = Subscriptions {
            tasks: tracker.tasks.subscribe(move |_| tasks_flag.set(true)),
            filters: tracker.filters.subscribe(move |_| filters_flag.set(true)),
            changed,
        };

        let search = SearchBox::with_text(&tracker.criteria().search, config.search_debounce());

        let mut app = Self {
            config,
            keys,
            tracker,
            ui: UiState::default(),
            search,
            form: None,
            filter_form: None,
            modals: ModalState::default(),
            status: StatusState::default(),
            subscriptions,
        };
        app.adjust_selected_index();
        Ok(app)
    }

    /// Tasks passing the current criteria, evaluated at the local time now
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tracker.visible(&Local::now())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.ui.selected_id.and_then(|id| self.tracker.tasks.get(id))
    }

    /// Advance timers: debounced search propagation, store change handling and
    /// status message expiry
    pub fn tick(&mut self, now: Instant) {
        self.search.tick(now, &mut self.tracker.filters);

        if self.subscriptions.changed.replace(false) {
            let search = &self.tracker.criteria().search;
            if !self.search.is_pending() && self.search.text() != search.as_str() {
                let search = search.clone();
                self.search.sync_from(&search);
            }
            self.adjust_selected_index();
        }

        self.check_status_message_timeout();
    }

    /// Keep the selection on the same task when possible, otherwise clamp it
    pub fn adjust_selected_index(&mut self) {
        let ids: Vec<TaskId> = self.visible_tasks().iter().map(|t| t.id).collect();

        if ids.is_empty() {
            self.ui.selected_index = 0;
            self.ui.selected_id = None;
            self.ui.list_state.select(None);
            return;
        }

        let index = self
            .ui
            .selected_id
            .and_then(|id| ids.iter().position(|v| *v == id))
            .unwrap_or_else(|| cmp::min(self.ui.selected_index, ids.len() - 1));

        self.ui.selected_index = index;
        self.ui.selected_id = Some(ids[index]);
        self.sync_list_state();
    }

    /// Sync ListState with selected_index for proper scrolling
    pub fn sync_list_state(&mut self) {
        self.ui.list_state.select(Some(self.ui.selected_index));
    }

    pub fn move_selection_up(&mut self) {
        if self.ui.selected_index > 0 {
            self.select_visible(self.ui.selected_index - 1);
        }
    }

    pub fn move_selection_down(&mut self) {
        self.select_visible(self.ui.selected_index + 1);
    }

    fn select_visible(&mut self, index: usize) {
        let id = self.visible_tasks().get(index).map(|t| t.id);
        if let Some(id) = id {
            self.ui.selected_index = index;
            self.ui.selected_id = Some(id);
            self.sync_list_state();
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    pub fn check_status_message_timeout(&mut self) {
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_search_mode(&mut self) {
        self.ui.mode = Mode::Search;
    }

    pub fn exit_search_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn add_to_search(&mut self, ch: char, now: Instant) {
        self.search.push_char(ch, now);
    }

    pub fn remove_from_search(&mut self, now: Instant) {
        self.search.pop_char(now);
    }

    pub fn clear_search(&mut self, now: Instant) {
        self.search.clear(now);
    }

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    pub fn enter_create_mode(&mut self) {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        self.form = Some(TaskFormState {
            current_field: FormField::Title,
            title: Editor::new(),
            due_date: Editor::from_string(today),
            priority: Priority::Medium,
            tags: Editor::new(),
            editing_task_id: None,
            error: None,
        });
        self.ui.mode = Mode::Form;
    }

    pub fn enter_edit_mode(&mut self) {
        let Some(task) = self.selected_task() else {
            self.set_status_message("No task selected".to_string());
            return;
        };

        let raw = RawTaskForm::from_task(task, &Local);
        let state = TaskFormState {
            current_field: FormField::Title,
            title: Editor::from_string(raw.title),
            due_date: Editor::from_string(raw.due_date),
            priority: task.priority,
            tags: Editor::from_string(raw.tags),
            editing_task_id: Some(task.id),
            error: None,
        };
        self.form = Some(state);
        self.ui.mode = Mode::Form;
    }

    pub fn exit_form_mode(&mut self) {
        self.form = None;
        self.ui.mode = Mode::View;
    }

    pub fn navigate_form_field(&mut self, forward: bool) {
        if let Some(form) = self.form.as_mut() {
            form.current_field = form.current_field.next(forward);
        }
    }

    pub fn is_form_priority_field_active(&self) -> bool {
        self.form
            .as_ref()
            .is_some_and(|f| f.current_field == FormField::Priority)
    }

    pub fn cycle_form_priority(&mut self, forward: bool) {
        if let Some(form) = self.form.as_mut() {
            form.priority = form.priority.cycle(forward);
        }
    }

    /// Editor of the focused text field; None on the priority selector
    pub fn get_current_form_editor(&mut self) -> Option<&mut Editor> {
        let form = self.form.as_mut()?;
        match form.current_field {
            FormField::Title => Some(&mut form.title),
            FormField::DueDate => Some(&mut form.due_date),
            FormField::Tags => Some(&mut form.tags),
            FormField::Priority => None,
        }
    }

    /// Validate the form and create or update the task. On a validation error
    /// the form stays open with the message shown.
    pub fn save_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let now = Local::now();

        let prior = match form.editing_task_id {
            Some(id) => match self.tracker.tasks.get(id) {
                Some(task) => Some(task.clone()),
                None => {
                    form.error = Some("Task no longer exists".to_string());
                    return;
                }
            },
            None => None,
        };
        let current_due = prior
            .as_ref()
            .map(|t| t.due_date.with_timezone(&Local).date_naive());

        let input = match form.raw().validate(now.date_naive(), current_due) {
            Ok(input) => input,
            Err(e) => {
                form.error = Some(e.to_string());
                return;
            }
        };

        let task = match prior.as_ref() {
            Some(prior) => form::map_form(input, FormMode::Edit(prior), &now),
            None => form::map_form(input, FormMode::Create, &now),
        };
        let id = task.id;
        let message = if prior.is_some() {
            self.tracker.tasks.update(task);
            "Task updated"
        } else {
            self.tracker.tasks.add(task);
            "Task created"
        };
        debug!("event=tui_form_save id={}", id);

        self.exit_form_mode();
        self.ui.selected_id = Some(id);
        self.adjust_selected_index();
        self.set_status_message(message.to_string());
    }

    pub fn toggle_selected_task(&mut self) {
        let Some(id) = self.ui.selected_id else {
            return;
        };
        if self.tracker.tasks.toggle_completed(id) {
            let done = self.tracker.tasks.get(id).is_some_and(|t| t.completed);
            self.set_status_message(if done { "Task completed" } else { "Task reopened" }.to_string());
        }
    }

    pub fn request_delete(&mut self) {
        if let Some(id) = self.ui.selected_id {
            self.modals.delete_confirmation = Some(id);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.modals.delete_confirmation = None;
    }

    /// Run the highlighted choice of the delete dialog
    pub fn confirm_delete(&mut self) {
        let Some(id) = self.modals.delete_confirmation.take() else {
            return;
        };
        if self.modals.delete_modal_selection != 0 {
            return;
        }
        if self.tracker.tasks.remove(id) {
            self.set_status_message("Task deleted".to_string());
        } else {
            self.set_status_message("Task no longer exists".to_string());
        }
    }

    pub fn enter_filter_mode(&mut self) {
        self.filter_form = Some(FilterFormState {
            current_field: FilterField::Status,
            priority_index: 0,
            tag_index: 0,
        });
        self.ui.mode = Mode::Filter;
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter_form = None;
        self.ui.mode = Mode::View;
    }

    pub fn navigate_filter_field(&mut self, forward: bool) {
        if let Some(state) = self.filter_form.as_mut() {
            state.current_field = state.current_field.next(forward);
        }
    }

    /// Tags offered by the filter modal: every tag in use, plus selected tags
    /// no task carries any more so they can still be cleared
    pub fn filter_tag_options(&self) -> Vec<String> {
        let mut tags = self.tracker.tasks.all_tags();
        for tag in &self.tracker.criteria().tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }

    /// Left/Right in the filter modal: cycle single-choice fields, move the
    /// cursor over multi-choice ones. Single-choice changes apply at once.
    pub fn move_filter_cursor(&mut self, forward: bool) {
        let tag_count = self.filter_tag_options().len();
        let Some(state) = self.filter_form.as_mut() else {
            return;
        };
        let filters = &mut self.tracker.filters;
        match state.current_field {
            FilterField::Status => {
                let status = filters.criteria().status.cycle(forward);
                filters.set_status(status);
            }
            FilterField::DateRange => {
                let range = filters.criteria().date_range.cycle(forward);
                filters.set_date_range(range);
            }
            FilterField::Priority => {
                state.priority_index = step(state.priority_index, Priority::ALL.len(), forward);
            }
            FilterField::Tags => {
                state.tag_index = step(state.tag_index, tag_count, forward);
            }
        }
    }

    /// Space in the filter modal: toggle the priority or tag under the cursor
    pub fn toggle_filter_option(&mut self) {
        let Some(state) = self.filter_form.clone() else {
            return;
        };
        if matches!(state.current_field, FilterField::Status | FilterField::DateRange) {
            self.move_filter_cursor(true);
            return;
        }

        let tags = self.filter_tag_options();
        let filters = &mut self.tracker.filters;
        match state.current_field {
            FilterField::Status | FilterField::DateRange => {}
            FilterField::Priority => {
                let Some(priority) = Priority::ALL.get(state.priority_index).copied() else {
                    return;
                };
                let mut selected = filters.criteria().priority.clone();
                if !selected.remove(&priority) {
                    selected.insert(priority);
                }
                filters.set_priority(selected);
            }
            FilterField::Tags => {
                let Some(tag) = tags.get(state.tag_index) else {
                    return;
                };
                let mut selected: BTreeSet<String> = filters.criteria().tags.clone();
                if !selected.remove(tag) {
                    selected.insert(tag.clone());
                }
                filters.set_tags(selected);
            }
        }
    }

    pub fn reset_filters(&mut self) {
        self.tracker.filters.reset_filters();
        self.search.sync_from("");
        self.set_status_message("Filters cleared".to_string());
    }

    pub fn get_filter_summary(&self) -> String {
        self.tracker.filters.summary()
    }

    /// Key hints for the status bar in the current mode
    pub fn key_hints(&self) -> Vec<String> {
        use crate::utils::format_key_binding_for_display as show;
        let kb = &self.config.key_bindings;
        match self.ui.mode {
            Mode::View => vec![
                format!("{}: New", show(&kb.new)),
                format!("{}: Edit", show(&kb.edit)),
                format!("{}: Toggle", show(&kb.toggle_task_status)),
                format!("{}: Delete", show(&kb.delete)),
                format!("{}: Search", show(&kb.search)),
                format!("{}: Filters", show(&kb.filter)),
                format!("{}: Reset filters", show(&kb.reset_filters)),
                format!("{}: Help", show(&kb.help)),
                format!("{}: Quit", show(&kb.quit)),
            ],
            Mode::Search => vec!["Type to search".to_string(), "Enter/Esc: Done".to_string()],
            Mode::Form => vec![
                "Tab: Next field".to_string(),
                "←→: Priority".to_string(),
                format!("{}: Save", show(&kb.save)),
                "Esc: Cancel".to_string(),
            ],
            Mode::Filter => vec![
                "Tab: Next field".to_string(),
                "←→: Change".to_string(),
                "Space: Toggle".to_string(),
                format!("{}: Reset", show(&kb.reset_filters)),
                "Esc: Close".to_string(),
            ],
            Mode::Help => vec!["Esc: Close".to_string()],
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.search.teardown();
        self.tracker.tasks.unsubscribe(self.subscriptions.tasks);
        self.tracker.filters.unsubscribe(self.subscriptions.filters);
    }
}

fn step(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}
