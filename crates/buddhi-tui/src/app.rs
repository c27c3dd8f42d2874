use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use buddhi_core::{Endpoint, EndpointError, HttpEndpoint, Session};
use crate::tui::AppEvent;
use crate::ui::wrap_text_to_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    History,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub session: Session,
    pub input_cursor: usize, // cursor position in session.input, in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_chat: bool, // keep the newest text in view while revealing

    // History panel state
    pub show_history: bool,
    pub history_state: ListState,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub history_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // One-line notice shown in the footer (e.g. a rejected submission)
    pub status: Option<String>,

    pub endpoint: HttpEndpoint,
}

impl App {
    pub fn new(endpoint: HttpEndpoint) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,
            session: Session::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,

            show_history: false,
            history_state: ListState::default(),

            chat_area: None,
            history_area: None,

            animation_frame: 0,
            status: None,

            endpoint,
        }
    }

    /// Send the composed text. The reply comes back through `tx` as an
    /// [`AppEvent::Reply`] so the UI keeps running while the request is out.
    pub fn submit_input(&mut self, tx: &UnboundedSender<AppEvent>) {
        let text = self.session.input.clone();

        match self.session.submit(&text) {
            Ok(Some(exchange)) => {
                self.input_cursor = 0;
                self.status = None;
                self.follow_chat = true;
                self.scroll_chat_to_bottom();

                // Spawn background task to query the endpoint
                let endpoint = self.endpoint.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = endpoint.ask(&exchange.question).await;
                    let _ = tx.send(AppEvent::Reply {
                        id: exchange.id,
                        result,
                    });
                });
            }
            Ok(None) => {}
            Err(e) => {
                self.status = Some(format!("{}, press s to stop it", e));
            }
        }
    }

    pub fn receive_reply(&mut self, id: u64, result: Result<String, EndpointError>) {
        if self.session.receive(id, result) {
            self.scroll_chat_to_bottom();
        }
    }

    /// Reveal one more character of the pending reply (called by Reveal event).
    /// Returns false when nothing is being revealed.
    pub fn reveal_tick(&mut self) -> bool {
        if self.session.step().is_none() {
            return false;
        }
        self.scroll_chat_to_bottom();
        true
    }

    pub fn stop_reveal(&mut self) {
        self.session.cancel();
    }

    /// Start a new conversation
    pub fn clear_chat(&mut self) {
        self.session.reset();
        self.input_cursor = 0;
        self.chat_scroll = 0;
        self.follow_chat = true;
        self.history_state.select(None);
        self.status = None;
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
        if self.show_history {
            let count = self.question_count();
            if count > 0 && self.history_state.selected().is_none() {
                self.history_state.select(Some(count - 1));
            }
            self.focus = FocusPane::History;
            self.input_mode = InputMode::Normal;
        } else {
            self.focus = FocusPane::Chat;
        }
    }

    pub fn question_count(&self) -> usize {
        self.session.questions().count()
    }

    pub fn history_nav_down(&mut self) {
        let len = self.question_count();
        if len > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn history_nav_up(&mut self) {
        if self.question_count() > 0 {
            let i = self.history_state.selected().unwrap_or(0);
            self.history_state.select(Some(i.saturating_sub(1)));
        }
    }

    /// Put the selected history question back into the input box
    pub fn reuse_selected_question(&mut self) {
        let Some(idx) = self.history_state.selected() else {
            return;
        };
        if self.session.reuse(idx) {
            self.input_cursor = self.session.input.chars().count();
            self.focus = FocusPane::Chat;
            self.input_mode = InputMode::Editing;
        }
    }

    /// Tick animation frame (called by Tick event). Returns whether it moved.
    pub fn tick_animation(&mut self) -> bool {
        if !self.session.is_waiting() {
            return false;
        }
        self.animation_frame = (self.animation_frame + 1) % 3;
        true
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll());
        self.follow_chat = self.chat_scroll >= self.max_chat_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_chat = false;
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_chat_height() / 2).max(1)
    }

    /// Scroll chat to bottom so the newest text is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        if self.follow_chat {
            self.chat_scroll = self.max_chat_scroll();
        }
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_line_count().saturating_sub(self.visible_chat_height())
    }

    /// Number of rendered chat lines, mirroring the layout in `ui::render_chat`
    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let wrapped = |text: &str| -> usize {
            text.lines()
                .map(|line| wrap_text_to_width(line, wrap_width).len())
                .sum::<usize>()
                .max(1)
        };

        let mut total_lines: usize = 0;

        for msg in self.session.messages() {
            total_lines += 1; // Role line ("You:" or "AI:")
            total_lines += wrapped(&msg.text);
            total_lines += 1; // Blank line after message
        }

        if let Some(partial) = self.session.revealing() {
            // "AI:" + partial text with cursor
            total_lines += 1 + wrapped(partial);
        } else if self.session.is_waiting() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        total_lines.min(u16::MAX as usize) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_app() -> App {
        // Nothing listens on the discard port
        let endpoint =
            HttpEndpoint::new("http://127.0.0.1:9/api/gemini", Duration::from_millis(200)).unwrap();
        App::new(endpoint)
    }

    fn answer(app: &mut App, question: &str, reply: &str) {
        let exchange = app.session.submit(question).unwrap().unwrap();
        app.receive_reply(exchange.id, Ok(reply.to_string()));
        while app.session.in_flight() {
            app.reveal_tick();
        }
    }

    #[tokio::test]
    async fn test_submit_input_reports_reply_through_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.session.input = "Hi".to_string();
        app.input_cursor = 2;

        app.submit_input(&tx);
        assert!(app.session.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.session.is_waiting());

        match rx.recv().await {
            Some(AppEvent::Reply { id, result }) => {
                assert!(result.is_err());
                app.receive_reply(id, result);
            }
            other => panic!("expected a reply event, got {:?}", other),
        }
        assert!(!app.session.in_flight());
        assert_eq!(app.session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_while_busy_sets_status() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.session.submit("first").unwrap();

        app.session.input = "second".to_string();
        app.submit_input(&tx);

        assert!(app.status.is_some());
        assert_eq!(app.session.input, "second");
        assert_eq!(app.session.messages().len(), 1);
    }

    #[test]
    fn test_blank_submit_does_nothing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = test_app();
        app.session.input = "   ".to_string();
        app.submit_input(&tx);

        assert!(app.session.messages().is_empty());
        assert!(!app.session.in_flight());
        assert!(app.status.is_none());
    }

    #[test]
    fn test_history_reuse() {
        let mut app = test_app();
        answer(&mut app, "what is dharma?", "A path.");
        answer(&mut app, "and karma?", "Action.");

        app.toggle_history();
        assert_eq!(app.focus, FocusPane::History);
        assert_eq!(app.history_state.selected(), Some(1));

        app.history_nav_up();
        app.reuse_selected_question();
        assert_eq!(app.session.input, "what is dharma?");
        assert_eq!(app.input_cursor, "what is dharma?".chars().count());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.focus, FocusPane::Chat);

        app.history_nav_down();
        app.history_nav_down();
        assert_eq!(app.history_state.selected(), Some(1));
    }

    #[test]
    fn test_clear_chat_resets_view() {
        let mut app = test_app();
        answer(&mut app, "Hi", "Hello!");
        app.toggle_history();
        app.chat_scroll = 4;

        app.clear_chat();
        assert!(app.session.messages().is_empty());
        assert_eq!(app.chat_scroll, 0);
        assert_eq!(app.history_state.selected(), None);
    }

    #[test]
    fn test_stop_reveal_keeps_partial_reply() {
        let mut app = test_app();
        let exchange = app.session.submit("Hi").unwrap().unwrap();
        app.receive_reply(exchange.id, Ok("Hello!".to_string()));
        app.reveal_tick();
        app.reveal_tick();
        app.reveal_tick();

        app.stop_reveal();
        app.reveal_tick();
        assert_eq!(app.session.messages()[1].text, "Hel");
        assert!(!app.session.in_flight());
    }

    #[test]
    fn test_scroll_follows_new_text_until_user_scrolls_up() {
        let mut app = test_app();
        app.chat_height = 3;
        app.chat_width = 20;
        answer(&mut app, "Hi", "one\ntwo\nthree\nfour");
        assert!(app.chat_scroll > 0);
        let bottom = app.chat_scroll;

        app.scroll_up(1);
        assert!(!app.follow_chat);
        answer(&mut app, "more", "five");
        assert_eq!(app.chat_scroll, bottom - 1);

        app.scroll_down(100);
        assert!(app.follow_chat);
    }

    #[test]
    fn test_thinking_animation_only_while_waiting() {
        let mut app = test_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.session.submit("Hi").unwrap();
        app.tick_animation();
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
    }
}
