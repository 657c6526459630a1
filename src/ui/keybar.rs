use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::state::{AppState, InputMode};

pub fn draw_keybar(f: &mut Frame, area: Rect, state: &AppState) {
    let mut bindings: Vec<(&str, &str)> = match state.input_mode {
        InputMode::TextInput => vec![
            ("←/→", "cursor"),
            ("Enter", if state.is_essay() { "new line" } else { "save" }),
            ("Esc", "done editing"),
            ("Tab", "next blank"),
        ],
        InputMode::ChoiceSelect => vec![
            ("a-z", "answer"),
            ("↑/↓", "prev/next"),
            ("Tab", "next item"),
            ("Ctrl+F", "mark"),
        ],
        InputMode::Navigation => vec![
            ("Enter", "edit"),
            ("↑/↓", "prev/next"),
            ("PgUp/PgDn", "scroll"),
            ("Ctrl+F", "mark"),
        ],
    };

    if state.room.audio().is_some() && !state.room.suppresses_media_keys() {
        bindings.push(("Ctrl+P", "play/pause"));
    }
    if state.room.is_official() {
        bindings.push(("Ctrl+K", "finish section"));
    }
    bindings.push(("Ctrl+S", "submit"));
    bindings.push(("Ctrl+Q", "quit"));

    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    for (i, (key, action)) in bindings.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(
            key.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {}", action)));
    }

    let line = Line::from(spans);
    let widget = Paragraph::new(line).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(widget, area);
}
