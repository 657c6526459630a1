use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;

use ieltsroom::model::SectionStatus;

use crate::state::{AppState, SidebarRow};

/// First visible row so that `current` stays on screen with a little context above it.
pub fn scroll_offset(current: usize, visible: usize) -> usize {
    if visible == 0 {
        return current;
    }
    let context = (visible / 4).min(3);
    if current + context < visible {
        0
    } else {
        current + context + 1 - visible
    }
}

pub fn draw_sidebar(f: &mut Frame, area: Rect, state: &AppState) {
    let rows = state.sidebar_rows();
    let visible = area.height.saturating_sub(1) as usize; // title row
    let current = state.current_sidebar_row();
    let offset = scroll_offset(current, visible);
    let label_max = area.width.saturating_sub(9) as usize;

    let mut lines: Vec<Line> = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(offset).take(visible) {
        match *row {
            SidebarRow::Section(si) => {
                let section = &state.room.data().sections[si];
                let (icon, color) = match state.room.section_status(si) {
                    SectionStatus::Locked => ("🔒", Color::DarkGray),
                    SectionStatus::Available => ("○", Color::White),
                    SectionStatus::InProgress => ("▶", Color::Yellow),
                    SectionStatus::Completed => ("✓", Color::Green),
                };
                let title: String = section.title.chars().take(label_max).collect();
                let answered = state.room.engine().answered_in_section(si);
                lines.push(Line::from(vec![
                    Span::styled(format!(" {} ", icon), Style::default().fg(color)),
                    Span::styled(
                        title,
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" {}/{}", answered, section.questions.len()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]));
            }
            SidebarRow::Question(si, qi) => {
                let q = &state.room.data().sections[si].questions[qi];
                let is_current = idx == current;
                let answered = state.room.engine().is_question_answered(q);
                let marked = state.room.is_marked(&q.key());
                let (icon, color) = if marked {
                    ("⚑", Color::Red)
                } else if answered {
                    ("✓", Color::Green)
                } else {
                    ("○", Color::White)
                };
                let style = if is_current {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD)
                } else if !state.room.is_section_accessible(si) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                let bg = if is_current { Color::DarkGray } else { Color::Reset };
                let kind: String = q.question_type.label().chars().take(label_max.saturating_sub(8)).collect();
                lines.push(Line::from(vec![
                    Span::styled(if is_current { "  ▸ " } else { "    " }, style),
                    Span::styled(format!("{} ", icon), Style::default().fg(color).bg(bg)),
                    Span::styled(format!("{:<7} ", q.label()), style),
                    Span::styled(kind, style.fg(Color::DarkGray)),
                ]));
            }
        }
    }

    let title = format!(
        " {} of {} answered ",
        state.room.engine().answered_count(),
        state.room.data().total_questions
    );
    let block = Block::default()
        .borders(Borders::RIGHT)
        .title(title)
        .title_style(Style::default().add_modifier(Modifier::BOLD));

    let widget = Paragraph::new(lines).block(block);
    f.render_widget(widget, area);

    if rows.len() > visible {
        let scrollbar_area = Rect {
            x: area.x,
            y: area.y + 1,
            width: area.width,
            height: visible as u16,
        };
        let mut scrollbar_state = ScrollbarState::new(rows.len().saturating_sub(1))
            .position(current)
            .viewport_content_length(3);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

#[cfg(test)]
mod tests {
    use super::scroll_offset;

    #[test]
    fn test_scroll_offset_keeps_current_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(5, 10), 0);
        for current in 0..40 {
            let offset = scroll_offset(current, 10);
            assert!(offset <= current);
            assert!(current < offset + 10);
        }
    }
}
