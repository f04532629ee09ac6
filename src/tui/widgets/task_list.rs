use chrono::{DateTime, Local};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Scrollbar, ScrollbarOrientation, ScrollbarState};

use crate::Config;
use crate::models::Task;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color, priority_color};
use crate::tui::widgets::truncate;

/// Two lines per task: status, title and priority, then due day and tags
pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    tasks: &[&Task],
    total_count: usize,
    list_state: &mut ListState,
    now: &DateTime<Local>,
    config: &Config,
) {
    let max_width = area.width.saturating_sub(4) as usize; // borders, padding and scrollbar

    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = if active_theme.highlight_fg.is_empty() {
        get_contrast_text_color(highlight_bg)
    } else {
        parse_color(&active_theme.highlight_fg)
    };

    let items: Vec<ListItem> = tasks
        .iter()
        .map(|task| task_item(task, max_width, now))
        .collect();

    let list_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_area = list_areas[0];
    let scrollbar_area = list_areas[1];

    let title = format!("Tasks ({} of {})", tasks.len(), total_count);
    let empty = tasks.is_empty();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(fg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));
    f.render_stateful_widget(list, list_area, list_state);

    if empty {
        let hint = if total_count == 0 {
            "No tasks yet. Press the new key to add one."
        } else {
            "No tasks match the current filters."
        };
        let inner = Rect::new(list_area.x + 2, list_area.y + 1, list_area.width.saturating_sub(4), 1);
        if list_area.height > 2 {
            f.render_widget(ratatui::widgets::Paragraph::new(truncate(hint, inner.width as usize)), inner);
        }
        return;
    }

    let visible_items = (list_area.height.saturating_sub(2) / 2) as usize;
    if tasks.len() > visible_items && list_area.height > 2 {
        let scrollbar_inner_area = Rect::new(
            scrollbar_area.x,
            list_area.y + 1,
            scrollbar_area.width,
            list_area.height.saturating_sub(2),
        );
        let mut scrollbar_state = ScrollbarState::new(tasks.len())
            .viewport_content_length(visible_items)
            .position(list_state.selected().unwrap_or(0));
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        f.render_stateful_widget(scrollbar, scrollbar_inner_area, &mut scrollbar_state);
    }
}

fn task_item<'a>(task: &Task, max_width: usize, now: &DateTime<Local>) -> ListItem<'a> {
    let status_indicator = if task.completed { "✓" } else { "○" };
    let title_style = if task.completed {
        Style::default().add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    };

    let priority = format!(" [{}]", task.priority);
    let title_width = max_width.saturating_sub(priority.chars().count() + 2);
    let first_line = Line::from(vec![
        Span::raw(format!("{} ", status_indicator)),
        Span::styled(truncate(&task.title, title_width), title_style),
        Span::styled(priority, Style::default().fg(priority_color(task.priority))),
    ]);

    let due = task.due_date.with_timezone(&Local);
    let overdue = !task.completed && due.date_naive() < now.date_naive();
    let mut details = format!("  due {}", due.format("%Y-%m-%d"));
    if overdue {
        details.push_str(" (overdue)");
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|t| format!("#{}", t)).collect();
        details.push_str("  ");
        details.push_str(&tags.join(" "));
    }
    let details_style = if overdue {
        Style::default().fg(ratatui::style::Color::Red)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    ListItem::new(vec![
        first_line,
        Line::from(Span::styled(truncate(&details, max_width), details_style)),
    ])
}
