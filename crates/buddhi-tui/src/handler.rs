use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply one event to the app. Returns whether the screen needs redrawing;
/// idle timer ticks don't.
pub fn handle_event(app: &mut App, event: AppEvent, tx: &UnboundedSender<AppEvent>) -> bool {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_chat_to_bottom(),
        AppEvent::Tick => return app.tick_animation(),
        AppEvent::Reveal => return app.reveal_tick(),
        AppEvent::Reply { id, result } => app.receive_reply(id, result),
    }
    true
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    // Global keys that work in any mode
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') => {
                app.clear_chat();
                return;
            }
            KeyCode::Char('s') => {
                app.stop_reveal();
                return;
            }
            _ => {}
        }
    }

    // Any key dismisses the footer notice
    app.status = None;

    match app.input_mode {
        InputMode::Normal => match app.focus {
            FocusPane::Chat => handle_chat_normal(app, key),
            FocusPane::History => handle_history_normal(app, key),
        },
        InputMode::Editing => handle_editing(app, key, tx),
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.session.input.chars().count();
        }

        KeyCode::Char('s') | KeyCode::Esc => app.stop_reveal(),
        KeyCode::Char('c') => app.clear_chat(),
        KeyCode::Char('h') => app.toggle_history(),
        KeyCode::Tab if app.show_history => app.focus = FocusPane::History,

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') | KeyCode::PageDown => app.scroll_down(app.half_page()),
        KeyCode::Char('u') | KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(u16::MAX),
        KeyCode::Char('G') | KeyCode::End => app.scroll_down(u16::MAX),

        _ => {}
    }
}

fn handle_history_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('h') | KeyCode::Esc => app.toggle_history(),
        KeyCode::Tab => app.focus = FocusPane::Chat,
        KeyCode::Char('j') | KeyCode::Down => app.history_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.history_nav_up(),
        KeyCode::Enter => app.reuse_selected_question(),
        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent, tx: &UnboundedSender<AppEvent>) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_input(tx),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.session.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
                app.session.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.session.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.session.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.session.input, app.input_cursor);
            app.session.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Determine which area the mouse is in (position-based scrolling)
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_history = app.history_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_history {
                app.history_nav_down();
            } else if in_chat {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_history {
                app.history_nav_up();
            } else if in_chat {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}
