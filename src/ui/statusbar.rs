use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use ieltsroom::room::NoticeLevel;

use crate::state::AppState;

pub fn draw_statusbar(f: &mut Frame, area: Rect, state: &AppState) {
    let engine = state.room.engine();
    let total = state.room.data().total_questions;
    let answered = engine.answered_count();

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(
            format!("✓ {}/{} answered", answered, total),
            Style::default().fg(Color::Green),
        ),
        Span::raw("   "),
        Span::styled(
            format!("⚑ {} marked", state.room.marked_count()),
            Style::default().fg(Color::Red),
        ),
        Span::raw("   "),
    ];

    if engine.is_submitting() {
        spans.push(Span::styled(
            "Submitting…",
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(toast) = &state.toast {
        let color = match toast.notice.level {
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Warn => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        spans.push(Span::styled(
            toast.notice.message.clone(),
            Style::default().fg(color),
        ));
    } else {
        spans.push(Span::styled("[?] help", Style::default().fg(Color::DarkGray)));
    }

    let widget = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(30, 30, 30)));
    f.render_widget(widget, area);
}
