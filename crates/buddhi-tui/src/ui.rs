use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use buddhi_core::ChatRole;
use crate::app::{App, FocusPane, InputMode};

const HISTORY_PANEL_WIDTH: u16 = 36;

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        // selected at the bottom .. selected at the top
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
pub(crate) fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Render `**bold**` runs; everything else is literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.show_history {
        let [chat_column, history_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(HISTORY_PANEL_WIDTH),
        ])
        .areas(body_area);
        render_chat(app, frame, chat_column);
        render_history(app, frame, history_area);
    } else {
        app.history_area = None;
        render_chat(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let count = app.session.messages().len();
    let count_indicator = if count > 0 {
        format!(" [{} messages]", count)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" BuddhiAI ", Style::default().fg(Color::Green).bold()),
        Span::styled("Your Intelligent Companion", Style::default().fg(Color::White)),
        Span::styled(count_indicator, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<(&str, &str)> = match (app.input_mode, app.focus) {
        (InputMode::Editing, _) => vec![("Enter", "ask"), ("Esc", "normal mode")],
        (InputMode::Normal, FocusPane::History) => vec![
            ("j/k", "select"),
            ("Enter", "reuse"),
            ("h", "close history"),
            ("q", "quit"),
        ],
        (InputMode::Normal, FocusPane::Chat) => {
            let mut hints = vec![("i", "type"), ("j/k", "scroll")];
            if app.session.revealing().is_some() {
                hints.push(("s", "stop"));
            }
            hints.extend([("h", "history"), ("c", "clear chat"), ("q", "quit")]);
            hints
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];

    if let Some(status) = &app.status {
        spans.push(Span::styled(format!(" {} ", status), Style::default().fg(Color::Red)));
    } else {
        for (key, label) in hints {
            spans.push(Span::styled(format!(" {} ", key), key_style));
            spans.push(Span::styled(format!(" {} ", label), label_style));
            spans.push(Span::raw(" "));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn role_header(role: ChatRole) -> Line<'static> {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{}:", role.label()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Chat history on top, input at bottom
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_focused = app.focus == FocusPane::Chat && app.input_mode == InputMode::Normal;
    let chat_border_color = if chat_focused { Color::Cyan } else { Color::DarkGray };

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(chat_border_color))
        .title(" Chat with BuddhiAI ")
        .title_bottom(Line::from(format!(" {} ", app.endpoint.url())).right_aligned());

    let session = &app.session;
    let chat_text = if session.messages().is_empty() && !session.in_flight() {
        Text::from(Span::styled(
            "Type your question here...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in session.messages() {
            lines.push(role_header(msg.role));
            match msg.role {
                ChatRole::User => {
                    for line in msg.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    for line in msg.text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if let Some(partial) = session.revealing() {
            lines.push(role_header(ChatRole::Assistant));
            let mut partial_lines: Vec<Line> = partial.lines().map(parse_markdown_line).collect();
            if partial.is_empty() || partial.ends_with('\n') {
                partial_lines.push(Line::default());
            }
            // Blinking bar after the newest character
            if let Some(last) = partial_lines.last_mut() {
                last.spans.push(Span::styled(
                    "▌",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK),
                ));
            }
            lines.extend(partial_lines);
        } else if session.is_waiting() {
            lines.push(role_header(ChatRole::Assistant));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("AI is thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let title = if app.session.in_flight() {
        " Ask (waiting for reply) "
    } else {
        " Ask "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.session.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    app.history_area = Some(area);

    let focused = app.focus == FocusPane::History;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" History (Enter to reuse) ");

    let questions: Vec<ListItem> = app
        .session
        .questions()
        .map(|q| {
            let width = area.width.saturating_sub(4) as usize;
            let text: Vec<Line> = wrap_text_to_width(q, width)
                .into_iter()
                .map(Line::from)
                .collect();
            ListItem::new(text)
        })
        .collect();

    if questions.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No search history yet",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(questions)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let visible_height = area.height.saturating_sub(2) as usize;
    ensure_selected_visible(&mut app.history_state, visible_height);

    frame.render_stateful_widget(list, area, &mut app.history_state);
}
