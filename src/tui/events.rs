use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size as terminal_size};
use log::info;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::time::{Duration, Instant};

use crate::tui::App;
use crate::tui::app::Mode;
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, has_primary_modifier};

/// Restores the terminal when dropped, including during a panic unwind
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut guard = Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: false,
        };
        execute!(io::stdout(), EnterAlternateScreen)?;
        guard.alternate_screen_enabled = true;
        Ok(guard)
    }

    /// Restore on normal exit; drop then does nothing
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Errors are ignored here; we are already cleaning up
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Checked before entering the alternate screen so the message stays visible
    let (width, height) = terminal_size()?;
    let min_width = Layout::MIN_WIDTH + 2;
    let min_height = Layout::MIN_HEIGHT + 2;
    if width < min_width || height < min_height {
        return Err(TuiError::TerminalTooSmall {
            width,
            height,
            min_width,
            min_height,
        });
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    info!("event=tui_start tasks={}", app.tracker.tasks.len());

    loop {
        app.tick(Instant::now());

        let size = terminal.size()?;
        let layout = Layout::calculate(Rect::new(0, 0, size.width, size.height));
        if let Some(editor) = app.get_current_form_editor() {
            editor.update_horizontal_scroll(crate::tui::widgets::form::field_width(layout.inner_area));
        }
        terminal.draw(|f| crate::tui::render::render(f, &mut app, &layout))?;

        // Only Press events; Windows also reports Release
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                    break;
                }
            }
        }
    }

    guard.restore()?;
    info!("event=tui_exit status=ok");
    Ok(())
}

/// Route a key press by mode. Returns true when the user asked to quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if app.modals.delete_confirmation.is_some() {
        return handle_delete_confirmation_modal(app, key_event);
    }

    match app.ui.mode {
        Mode::Form => handle_form_mode(app, key_event),
        Mode::Search => handle_search_mode(app, key_event),
        Mode::Filter => handle_filter_mode(app, key_event),
        Mode::Help => handle_help_mode(app, key_event),
        Mode::View => handle_global_key_bindings(app, key_event),
    }
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match key_event.code {
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
            app.modals.delete_modal_selection = 1 - app.modals.delete_modal_selection.min(1);
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('y') => {
            app.modals.delete_modal_selection = 0;
            app.confirm_delete();
        }
        KeyCode::Esc | KeyCode::Char('n') => app.cancel_delete(),
        _ => {}
    }
    Ok(false)
}

fn handle_form_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if matches_key_event(key_event, &app.keys.save) {
        app.save_form();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc => app.exit_form_mode(),
        KeyCode::BackTab | KeyCode::Up => app.navigate_form_field(false),
        KeyCode::Tab | KeyCode::Down => {
            let forward = !key_event.modifiers.contains(KeyModifiers::SHIFT);
            app.navigate_form_field(forward);
        }
        KeyCode::Enter => {
            // Enter on the last field submits
            let on_last = app
                .form
                .as_ref()
                .is_some_and(|f| f.current_field == crate::tui::app::FormField::Tags);
            if on_last {
                app.save_form();
            } else {
                app.navigate_form_field(true);
            }
        }
        KeyCode::Left | KeyCode::Right if app.is_form_priority_field_active() => {
            app.cycle_form_priority(key_event.code == KeyCode::Right);
        }
        KeyCode::Char(' ') if app.is_form_priority_field_active() => app.cycle_form_priority(true),
        code => {
            if let Some(editor) = app.get_current_form_editor() {
                match code {
                    KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => editor.insert_char(c),
                    KeyCode::Backspace => editor.delete_char(),
                    KeyCode::Delete => editor.delete_forward(),
                    KeyCode::Left => editor.move_cursor_left(),
                    KeyCode::Right => editor.move_cursor_right(),
                    KeyCode::Home => editor.move_cursor_home(),
                    KeyCode::End => editor.move_cursor_end(),
                    _ => {}
                }
            }
        }
    }
    Ok(false)
}

fn handle_search_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let now = Instant::now();
    match key_event.code {
        KeyCode::Esc | KeyCode::Enter => app.exit_search_mode(),
        KeyCode::Char('u') if has_primary_modifier(key_event.modifiers) => app.clear_search(now),
        KeyCode::Char(c) => app.add_to_search(c, now),
        KeyCode::Backspace => app.remove_from_search(now),
        _ => {}
    }
    Ok(false)
}

fn handle_filter_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if matches_key_event(key_event, &app.keys.reset_filters) {
        app.reset_filters();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc | KeyCode::Enter => app.exit_filter_mode(),
        KeyCode::Char('f') if !has_primary_modifier(key_event.modifiers) => app.exit_filter_mode(),
        KeyCode::BackTab | KeyCode::Up => app.navigate_filter_field(false),
        KeyCode::Tab | KeyCode::Down => {
            let forward = !key_event.modifiers.contains(KeyModifiers::SHIFT);
            app.navigate_filter_field(forward);
        }
        KeyCode::Left => app.move_filter_cursor(false),
        KeyCode::Right => app.move_filter_cursor(true),
        KeyCode::Char(' ') => app.toggle_filter_option(),
        _ => {}
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || matches_key_event(key_event, &app.keys.help) {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = app.keys.clone();

    if matches_key_event(key_event, &keys.quit) {
        return Ok(true);
    }

    if matches_key_event(key_event, &keys.list_up) || key_event.code == KeyCode::Up {
        app.move_selection_up();
    } else if matches_key_event(key_event, &keys.list_down) || key_event.code == KeyCode::Down {
        app.move_selection_down();
    } else if matches_key_event(key_event, &keys.new) {
        app.enter_create_mode();
    } else if matches_key_event(key_event, &keys.edit) || key_event.code == KeyCode::Enter {
        app.enter_edit_mode();
    } else if matches_key_event(key_event, &keys.toggle_task_status) {
        app.toggle_selected_task();
    } else if matches_key_event(key_event, &keys.delete) || key_event.code == KeyCode::Delete {
        app.request_delete();
    } else if matches_key_event(key_event, &keys.search) {
        app.enter_search_mode();
    } else if matches_key_event(key_event, &keys.filter) {
        app.enter_filter_mode();
    } else if matches_key_event(key_event, &keys.reset_filters) {
        app.reset_filters();
    } else if matches_key_event(key_event, &keys.help) {
        app.enter_help_mode();
    } else if key_event.code == KeyCode::Esc {
        app.clear_status_message();
    }

    Ok(false)
}

fn matches_key_event(key_event: KeyEvent, binding: &ParsedKeyBinding) -> bool {
    // Ctrl on Windows/Linux, Option/Alt on macOS
    if binding.requires_ctrl != has_primary_modifier(key_event.modifiers) {
        return false;
    }
    binding.key_code == key_event.code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::{Config, Tracker};
    use std::rc::Rc;

    fn app() -> App {
        let tracker = Tracker::load(Rc::new(MemoryStorage::new()));
        App::new(Config::default(), tracker).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    #[test]
    fn quit_binding_ends_loop() {
        let mut app = app();
        assert!(!press(&mut app, KeyCode::Char('j')));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn typing_in_form_and_saving_with_ctrl_s() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.ui.mode, Mode::Form);
        for c in "Walk dog".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        // 'q' is text inside the form, not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Backspace);

        let save = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        handle_key_event(&mut app, save).unwrap();
        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.tracker.tasks.tasks()[0].title, "Walk dog");
    }

    #[test]
    fn search_mode_captures_letters() {
        let mut app = app();
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.search.text(), "q");
        assert!(app.search.is_pending());
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn delete_dialog_can_be_cancelled() {
        let mut app = app();
        app.enter_create_mode();
        for c in "Keep me".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.tracker.tasks.len(), 1);

        press(&mut app, KeyCode::Char('d'));
        assert!(app.modals.delete_confirmation.is_some());
        press(&mut app, KeyCode::Esc);
        assert!(app.modals.delete_confirmation.is_none());
        assert_eq!(app.tracker.tasks.len(), 1);
    }
}
