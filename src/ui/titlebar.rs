use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use ieltsroom::engine::AutoSaveStatus;
use ieltsroom::timer::{format_clock, ClockKind, WARNING_SECS};

use crate::state::AppState;

pub fn draw_titlebar(f: &mut Frame, area: Rect, state: &AppState) {
    let title = &state.room.data().meta.title;

    let mode = if state.room.is_official() {
        Span::styled(" EXAM ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" PRACTICE ", Style::default().fg(Color::Black).bg(Color::Cyan))
    };

    let (save_text, save_color) = match state.room.engine().autosave_status() {
        AutoSaveStatus::Idle => ("", Color::DarkGray),
        AutoSaveStatus::Saving => (" saving… ", Color::Yellow),
        AutoSaveStatus::Saved => (" saved ", Color::Green),
        AutoSaveStatus::Error => (" not saved ", Color::Red),
    };
    let save_span = Span::styled(save_text, Style::default().fg(save_color));

    let timer_text = match state.room.time_remaining() {
        Some(secs) => {
            let label = match state.room.clock_kind() {
                Some(ClockKind::Server) => "section",
                _ => "remaining",
            };
            let formatted = format!(" {} {} ", format_clock(secs), label);
            if secs <= WARNING_SECS {
                Span::styled(
                    formatted,
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Red)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(formatted, Style::default().fg(Color::Rgb(200, 200, 120)))
            }
        }
        None if state.room.clock_kind() == Some(ClockKind::Server) => {
            Span::styled(" syncing clock… ", Style::default().fg(Color::DarkGray))
        }
        None => Span::raw(""),
    };

    let title_text = format!("[ {} ]", title);
    let title_span = Span::styled(
        title_text.clone(),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    // Center the title between the mode tag and the right-aligned status
    let available = area.width as usize;
    let left_len = mode.content.chars().count();
    let right_len = save_span.content.chars().count() + timer_text.content.chars().count();
    let title_len = title_text.chars().count();
    let center_pad = (available.saturating_sub(title_len) / 2).saturating_sub(left_len);
    let right_pad = available.saturating_sub(left_len + center_pad + title_len + right_len);

    let line = Line::from(vec![
        mode,
        Span::raw(" ".repeat(center_pad)),
        title_span,
        Span::raw(" ".repeat(right_pad)),
        save_span,
        timer_text,
    ]);

    let widget = Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .alignment(Alignment::Left);
    f.render_widget(widget, area);
}
