use ratatui::layout::Rect;
use std::cmp;

/// Single-line text input with a character cursor and horizontal scrolling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Editor {
    pub text: String,
    pub cursor_col: usize,
    pub scroll_col: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `content`, cursor at the end
    pub fn from_string(content: String) -> Self {
        let cursor_col = content.chars().count();
        Self {
            text: content,
            cursor_col,
            scroll_col: 0,
        }
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' || ch == '\r' {
            return;
        }
        let col = cmp::min(self.cursor_col, self.len());
        let mut chars: Vec<char> = self.text.chars().collect();
        chars.insert(col, ch);
        self.text = chars.into_iter().collect();
        self.cursor_col = col + 1;
    }

    /// Delete the character before the cursor
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.len());
        if col == 0 {
            return;
        }
        let mut chars: Vec<char> = self.text.chars().collect();
        chars.remove(col - 1);
        self.text = chars.into_iter().collect();
        self.cursor_col = col - 1;
    }

    /// Delete the character under the cursor
    pub fn delete_forward(&mut self) {
        let col = cmp::min(self.cursor_col, self.len());
        if col >= self.len() {
            return;
        }
        let mut chars: Vec<char> = self.text.chars().collect();
        chars.remove(col);
        self.text = chars.into_iter().collect();
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.len() {
            self.cursor_col += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.len();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Keep the cursor inside a field `viewport_width` columns wide (borders included)
    pub fn update_horizontal_scroll(&mut self, viewport_width: usize) {
        let effective_width = viewport_width.saturating_sub(2).max(1);

        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        } else if self.cursor_col >= self.scroll_col + effective_width {
            self.scroll_col = self.cursor_col + 1 - effective_width;
        }
    }

    /// The slice of text visible from the current scroll offset
    pub fn visible_text(&self, viewport_width: usize) -> String {
        self.text
            .chars()
            .skip(self.scroll_col)
            .take(viewport_width.saturating_sub(2))
            .collect()
    }

    /// Screen position of the cursor inside a bordered `area`
    pub fn get_cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let col = cmp::min(self.cursor_col, self.len());
        let visible_col = col.checked_sub(self.scroll_col)?;

        let max_x = area.width.saturating_sub(2);
        if visible_col >= max_x as usize || area.height < 3 {
            return None;
        }

        Some((area.x + 1 + visible_col as u16, area.y + 1))
    }
}

impl std::fmt::Display for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_and_deletes_at_cursor() {
        let mut editor = Editor::from_string("milk".to_string());
        editor.move_cursor_home();
        editor.insert_char('ä');
        assert_eq!(editor.text, "ämilk");
        editor.move_cursor_end();
        editor.delete_char();
        assert_eq!(editor.text, "ämil");
        editor.move_cursor_home();
        editor.delete_forward();
        assert_eq!(editor.text, "mil");
        editor.insert_char('\n');
        assert_eq!(editor.text, "mil");
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut editor = Editor::from_string("abcdefghij".to_string());
        editor.update_horizontal_scroll(6);
        assert_eq!(editor.scroll_col, 7);
        assert_eq!(editor.visible_text(6), "hij");

        editor.move_cursor_home();
        editor.update_horizontal_scroll(6);
        assert_eq!(editor.scroll_col, 0);
        assert_eq!(editor.get_cursor_screen_pos(Rect::new(0, 0, 6, 3)), Some((1, 1)));
    }
}
