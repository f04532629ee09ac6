pub mod color;
pub mod confirm_delete;
pub mod editor;
pub mod filter_modal;
pub mod filters_box;
pub mod form;
pub mod help;
pub mod search_bar;
pub mod status_bar;
pub mod task_list;

use ratatui::layout::{Constraint, Flex, Layout, Rect};

/// Centered rect taking a percentage of `area`, for popups
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

/// Truncate to `max_width` characters, ending with "..." when cut
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 8), "a lon...");
    }

    #[test]
    fn popup_is_centered() {
        let area = popup_area(Rect::new(0, 0, 100, 50), 50, 50);
        assert_eq!((area.x, area.width, area.height), (25, 50, 25));
    }
}
