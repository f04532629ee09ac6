use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::Config;
use crate::tui::widgets::color::parse_color;

/// Search input shown above the list. The title notes when typed text has
/// not reached the filters yet.
pub fn render_search_bar(f: &mut Frame, area: Rect, text: &str, focused: bool, pending: bool, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let accent = parse_color(&active_theme.accent);

    let search_key = crate::utils::format_key_binding_for_display(&config.key_bindings.search);
    let title = if pending {
        format!("{}: Search (updating…)", search_key)
    } else {
        format!("{}: Search", search_key)
    };

    let border_style = if focused {
        Style::default().fg(accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(fg_color)
    };

    // Show the tail when the text is wider than the box
    let width = area.width.saturating_sub(2) as usize;
    let count = text.chars().count();
    let shown: String = if count >= width {
        text.chars().skip(count + 1 - width.max(1)).collect()
    } else {
        text.to_string()
    };
    let shown_len = shown.chars().count() as u16;

    let paragraph = Paragraph::new(shown)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color));
    f.render_widget(paragraph, area);

    if focused && area.height >= 3 {
        f.set_cursor_position(Position::new(area.x + 1 + shown_len, area.y + 1));
    }
}
