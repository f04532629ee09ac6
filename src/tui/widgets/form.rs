use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::Config;
use crate::models::Priority;
use crate::tui::app::{FormField, TaskFormState};
use crate::tui::widgets::color::{parse_color, priority_color};
use crate::tui::widgets::editor::Editor;
use crate::tui::widgets::popup_area;

fn form_popup(area: Rect) -> Rect {
    popup_area(area, 60, 80)
}

/// Width of a text field box when the form is drawn over `area`
pub fn field_width(area: Rect) -> usize {
    form_popup(area).width.saturating_sub(2) as usize
}

pub fn render_task_form(f: &mut Frame, area: Rect, form: &TaskFormState, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let accent = parse_color(&active_theme.accent);

    let popup = form_popup(area);
    f.render_widget(Clear, popup);

    let title = if form.editing_task_id.is_some() { "Edit Task" } else { "New Task" };
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = outer.inner(popup);
    f.render_widget(outer, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Due date
            Constraint::Length(3), // Priority
            Constraint::Length(3), // Tags
            Constraint::Length(1), // Error
            Constraint::Min(0),
        ])
        .split(inner);

    let label_style = |field: FormField| {
        if form.current_field == field {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(fg_color)
        }
    };

    let text_fields = [
        (FormField::Title, "Title", &form.title, rows[0]),
        (FormField::DueDate, "Due date (YYYY-MM-DD)", &form.due_date, rows[1]),
        (FormField::Tags, "Tags (comma-separated)", &form.tags, rows[3]),
    ];
    for (field, label, editor, field_area) in text_fields {
        render_text_field(f, field_area, label, editor, label_style(field));
        if form.current_field == field {
            if let Some((x, y)) = editor.get_cursor_screen_pos(field_area) {
                f.set_cursor_position(Position::new(x, y));
            }
        }
    }

    let priorities: Vec<Span> = Priority::ALL
        .iter()
        .flat_map(|p| {
            let style = if *p == form.priority {
                Style::default().fg(priority_color(*p)).add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default().fg(priority_color(*p))
            };
            [Span::styled(format!(" {} ", p), style), Span::raw(" ")]
        })
        .collect();
    let priority = Paragraph::new(Line::from(priorities)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Priority (←/→)")
            .border_style(label_style(FormField::Priority)),
    );
    f.render_widget(priority, rows[2]);

    if let Some(error) = &form.error {
        let error_line = Paragraph::new(error.as_str()).style(Style::default().fg(ratatui::style::Color::Red));
        f.render_widget(error_line, rows[4]);
    }
}

fn render_text_field(f: &mut Frame, area: Rect, label: &str, editor: &Editor, border_style: Style) {
    let paragraph = Paragraph::new(editor.visible_text(area.width as usize)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(label.to_string())
            .border_style(border_style),
    );
    f.render_widget(paragraph, area);
}
