use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::filter;
use crate::tui::app::Mode;
use crate::tui::widgets::{
    color::parse_color,
    confirm_delete::render_confirm_delete,
    filter_modal::render_filter_modal,
    filters_box::render_filters_box,
    form::render_task_form,
    help::render_help,
    search_bar::render_search_bar,
    status_bar::render_status_bar,
    task_list::render_task_list,
};
use crate::tui::{App, Layout};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("tasktrack")
        .title_alignment(Alignment::Center)
        .style(Style::default()
            .fg(parse_color(&active_theme.fg))
            .bg(parse_color(&active_theme.bg)));
    f.render_widget(outer_block, f.area());

    render_search_bar(
        f,
        layout.search_area,
        app.search.text(),
        app.ui.mode == Mode::Search,
        app.search.is_pending(),
        &app.config,
    );

    // Field-level borrows: the list state is mutated while tasks are borrowed
    let now = Local::now();
    let tasks = filter::visible(app.tracker.tasks.tasks(), app.tracker.filters.criteria(), &now);
    render_task_list(
        f,
        layout.list_area,
        &tasks,
        app.tracker.tasks.len(),
        &mut app.ui.list_state,
        &now,
        &app.config,
    );

    render_filters_box(f, layout.filters_area, &app.get_filter_summary(), &app.config);

    let hints = app.key_hints();
    render_status_bar(f, layout.status_area, app.status.message.as_deref(), &hints, &app.config);

    // Overlays
    match app.ui.mode {
        Mode::Form => {
            if let Some(form) = app.form.as_ref() {
                render_task_form(f, layout.inner_area, form, &app.config);
            }
        }
        Mode::Filter => render_filter_modal(f, layout.inner_area, app),
        Mode::Help => render_help(f, layout.inner_area, &app.config),
        Mode::View | Mode::Search => {}
    }

    if let Some(task) = app.modals.delete_confirmation.and_then(|id| app.tracker.tasks.get(id)) {
        render_confirm_delete(f, layout.inner_area, task, app.modals.delete_modal_selection, &app.config);
    }
}
