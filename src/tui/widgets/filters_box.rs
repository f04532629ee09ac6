use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;

pub fn render_filters_box(f: &mut Frame, area: Rect, summary: &str, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let title = format!(
        "{}: Filters  {}: Reset",
        crate::utils::format_key_binding_for_display(&config.key_bindings.filter),
        crate::utils::format_key_binding_for_display(&config.key_bindings.reset_filters),
    );
    let paragraph = Paragraph::new(summary)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}
