use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::utils::format_key_binding_for_display as show;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let style = Style::default()
        .fg(parse_color(&active_theme.fg))
        .bg(parse_color(&active_theme.bg));

    let popup = popup_area(area, 60, 80);
    f.render_widget(Clear, popup);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Help - Key Bindings")
            .title_alignment(Alignment::Center)
            .style(style))
        .style(style)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup);
}

fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Tasks:\n");
    text.push_str(&format!("  {} / {} or ↑ / ↓: Move selection\n", show(&kb.list_up), show(&kb.list_down)));
    text.push_str(&format!("  {}: New task\n", show(&kb.new)));
    text.push_str(&format!("  {} or Enter: Edit selected task\n", show(&kb.edit)));
    text.push_str(&format!("  {}: Toggle completed\n", show(&kb.toggle_task_status)));
    text.push_str(&format!("  {}: Delete selected task\n", show(&kb.delete)));
    text.push('\n');

    text.push_str("Filtering:\n");
    text.push_str(&format!("  {}: Focus search (Ctrl+u clears, Enter/Esc leaves)\n", show(&kb.search)));
    text.push_str(&format!("  {}: Open filters (Tab moves, ←/→ changes, Space toggles)\n", show(&kb.filter)));
    text.push_str(&format!("  {}: Reset all filters\n", show(&kb.reset_filters)));
    text.push('\n');

    text.push_str("Task form:\n");
    text.push_str("  Tab / Shift+Tab: Next / previous field\n");
    text.push_str(&format!("  {} or Enter on Tags: Save\n", show(&kb.save)));
    text.push_str("  Esc: Cancel\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Show/hide help\n", show(&kb.help)));
    text.push_str(&format!("  {}: Quit\n", show(&kb.quit)));

    text
}
