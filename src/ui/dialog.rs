use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::state::{AppState, Dialog};

const MAX_LISTED: usize = 6;

pub fn draw_dialog(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(dialog) = state.top_dialog() else {
        return;
    };

    match dialog {
        Dialog::ConfirmSubmit { incomplete, marked } => {
            draw_confirm_submit(f, area, incomplete, *marked)
        }
        Dialog::ConfirmCompleteSection => draw_confirm_complete_section(f, area, state),
        Dialog::ConfirmQuit => draw_confirm_quit(f, area, state),
        Dialog::Help => draw_help(f, area),
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn confirm_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("   [Enter] Confirm", Style::default().fg(Color::Green)),
        Span::raw("    "),
        Span::styled("[Esc] Cancel", Style::default().fg(Color::DarkGray)),
    ])
}

fn render_box(f: &mut Frame, area: Rect, width: u16, lines: Vec<Line<'static>>, color: Color) {
    let rect = centered_rect(width, lines.len() as u16 + 2, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let widget = Paragraph::new(lines).block(block);
    f.render_widget(widget, rect);
}

fn draw_confirm_submit(f: &mut Frame, area: Rect, incomplete: &[String], marked: usize) {
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Submit your answers?",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if !incomplete.is_empty() {
        lines.push(Line::from(format!(
            "   {} question(s) are not complete:",
            incomplete.len()
        )));
        let mut listed = incomplete
            .iter()
            .take(MAX_LISTED)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if incomplete.len() > MAX_LISTED {
            listed.push_str(", …");
        }
        lines.push(Line::from(Span::styled(
            format!("   {}", listed),
            Style::default().fg(Color::White),
        )));
    }
    if marked > 0 {
        lines.push(Line::from(format!(
            "   {} question(s) are marked for review.",
            marked
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("   You cannot change answers afterwards."));
    lines.push(Line::from(""));
    lines.push(confirm_line());

    render_box(f, area, 50, lines, Color::Yellow);
}

fn draw_confirm_complete_section(f: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .room
        .current_section()
        .and_then(|s| s.section_type)
        .map(|t| t.to_string())
        .unwrap_or_else(|| "this section".to_string());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("   Finish {}?", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("   The section will be locked and the"),
        Line::from("   next one starts immediately."),
        Line::from(""),
        confirm_line(),
    ];
    render_box(f, area, 44, lines, Color::Yellow);
}

fn draw_confirm_quit(f: &mut Frame, area: Rect, state: &AppState) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Quit?",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("   Answers are kept locally."),
    ];
    if state.room.is_official() {
        lines.push(Line::from("   The exam clock keeps running."));
    }
    lines.push(Line::from(""));
    lines.push(confirm_line());
    render_box(f, area, 40, lines, Color::Yellow);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Key Bindings",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("   ↑/↓         Previous/Next question"),
        Line::from("   Tab         Next blank / row / item"),
        Line::from("   a-z         Select/toggle choice"),
        Line::from("   Enter       Edit or save an answer"),
        Line::from("   Esc         Stop editing"),
        Line::from("   PgUp/PgDn   Scroll passage"),
        Line::from("   Ctrl+F      Mark for review"),
        Line::from("   Ctrl+G      Next section"),
        Line::from("   Ctrl+K      Finish section (exam)"),
        Line::from("   Ctrl+P      Play/pause recording"),
        Line::from("   Ctrl+←/→    Seek recording"),
        Line::from("   Ctrl+S      Submit"),
        Line::from("   Ctrl+Q      Quit (answers kept)"),
        Line::from("   ?           This help"),
        Line::from(""),
        Line::from(Span::styled(
            "        [Esc] Close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let rect = centered_rect(46, lines.len() as u16 + 2, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(Style::default().fg(Color::Cyan));
    let widget = Paragraph::new(lines).block(block);
    f.render_widget(widget, rect);
}
