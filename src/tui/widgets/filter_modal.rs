use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::filter::{DateRange, FilterCriteria, StatusFilter};
use crate::models::Priority;
use crate::tui::App;
use crate::tui::app::{FilterField, FilterFormState};
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;

/// Filter modal as a popup overlay. Every change is already applied; the
/// modal only shows the criteria and moves a cursor over the choices.
pub fn render_filter_modal(f: &mut Frame, area: Rect, app: &App) {
    let Some(state) = app.filter_form.as_ref() else {
        return;
    };

    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let palette = Palette {
        normal: Style::default().fg(fg_color).bg(bg_color),
        cursor: Style::default().fg(get_contrast_text_color(highlight_bg)).bg(highlight_bg),
        accent: Style::default().fg(parse_color(&active_theme.accent)).add_modifier(Modifier::BOLD),
    };

    let popup = popup_area(area, 70, 70);
    f.render_widget(Clear, popup);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Filters")
        .title_alignment(Alignment::Center)
        .style(palette.normal);
    let inner = outer.inner(popup);
    f.render_widget(outer, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Length(3), // Priority
            Constraint::Length(3), // Date range
            Constraint::Min(3),    // Tags
        ])
        .split(inner);

    let criteria = app.tracker.criteria();
    let tags = app.filter_tag_options();

    render_field(f, rows[0], "Status", state, FilterField::Status, status_line(criteria, &palette), &palette);
    render_field(f, rows[1], "Priority", state, FilterField::Priority, priority_line(criteria, state, &palette), &palette);
    render_field(f, rows[2], "Due date", state, FilterField::DateRange, date_line(criteria, &palette), &palette);
    render_field(f, rows[3], "Tags", state, FilterField::Tags, tags_line(criteria, &tags, state, &palette), &palette);
}

struct Palette {
    normal: Style,
    cursor: Style,
    accent: Style,
}

fn render_field(
    f: &mut Frame,
    area: Rect,
    label: &str,
    state: &FilterFormState,
    field: FilterField,
    line: Line<'static>,
    palette: &Palette,
) {
    let active = state.current_field == field;
    let title = if active { format!("> {}", label) } else { format!("  {}", label) };
    let border_style = if active { palette.accent } else { palette.normal };
    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border_style))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn status_line(criteria: &FilterCriteria, palette: &Palette) -> Line<'static> {
    Line::from(
        StatusFilter::ALL
            .iter()
            .map(|s| choice(s.label(), *s == criteria.status, false, palette))
            .collect::<Vec<_>>(),
    )
}

fn date_line(criteria: &FilterCriteria, palette: &Palette) -> Line<'static> {
    Line::from(
        DateRange::ALL
            .iter()
            .map(|r| choice(r.label(), *r == criteria.date_range, false, palette))
            .collect::<Vec<_>>(),
    )
}

fn priority_line(criteria: &FilterCriteria, state: &FilterFormState, palette: &Palette) -> Line<'static> {
    let on_field = state.current_field == FilterField::Priority;
    Line::from(
        Priority::ALL
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let label = check_label(p.as_str(), criteria.priority.contains(p));
                choice(&label, false, on_field && i == state.priority_index, palette)
            })
            .collect::<Vec<_>>(),
    )
}

fn tags_line(criteria: &FilterCriteria, tags: &[String], state: &FilterFormState, palette: &Palette) -> Line<'static> {
    if tags.is_empty() {
        return Line::from(Span::styled("No tags in use", palette.normal.add_modifier(Modifier::DIM)));
    }
    let on_field = state.current_field == FilterField::Tags;
    Line::from(
        tags.iter()
            .enumerate()
            .map(|(i, tag)| {
                let label = check_label(tag, criteria.tags.contains(tag));
                choice(&label, false, on_field && i == state.tag_index, palette)
            })
            .collect::<Vec<_>>(),
    )
}

fn check_label(label: &str, checked: bool) -> String {
    format!("[{}] {}", if checked { "x" } else { " " }, label)
}

fn choice(label: &str, selected: bool, cursor: bool, palette: &Palette) -> Span<'static> {
    let style = if cursor {
        palette.cursor
    } else if selected {
        palette.accent.fg(Color::Reset).add_modifier(Modifier::REVERSED)
    } else {
        palette.normal
    };
    Span::styled(format!(" {} ", label), style)
}
