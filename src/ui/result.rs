use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use serde_json::Value;

use ieltsroom::model::{QuestionResult, Submission, SubmitOutcome};

use crate::state::AppState;

pub fn draw_result(f: &mut Frame, area: Rect, state: &AppState) {
    match state.room.outcome() {
        Some(SubmitOutcome::Completed { submission }) => draw_completed(f, area, state, submission),
        Some(SubmitOutcome::Practice { results, .. }) => draw_practice(f, area, state, results),
        None => {}
    }
}

fn draw_completed(f: &mut Frame, area: Rect, state: &AppState, submission: &Submission) {
    let data = state.room.data();
    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "✓ Answers Submitted",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(data.meta.title.clone()),
        Line::from(format!("Submission #{}", submission.id)),
        Line::from(format!(
            "{} of {} questions answered",
            state.room.engine().answered_count(),
            data.total_questions
        )),
        Line::from(""),
        Line::from("Results are published once your work is graded."),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] Exit",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    let block = Block::default().borders(Borders::ALL);
    let widget = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(widget, area);
}

fn draw_practice(f: &mut Frame, area: Rect, state: &AppState, results: &[QuestionResult]) {
    let data = state.room.data();
    let correct = results
        .iter()
        .filter(|r| r.is_correct == Some(true))
        .count();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  Practice result: {} / {}", correct, results.len()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for result in results {
        let label = data
            .find(&result.question_id.to_string())
            .map(|(_, _, q)| q.label())
            .unwrap_or_else(|| format!("#{}", result.question_id));
        let (icon, color) = match result.is_correct {
            Some(true) => ("✓", Color::Green),
            Some(false) => ("✗", Color::Red),
            None => ("·", Color::DarkGray),
        };
        let mut spans = vec![
            Span::styled(format!("  {} ", icon), Style::default().fg(color)),
            Span::raw(format!("{:<10}", label)),
        ];
        if result.is_correct != Some(true) {
            if let Some(expected) = &result.correct_answer {
                spans.push(Span::styled(
                    format!("answer: {}", display_value(expected)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  [↑/↓] Scroll  [Enter] Exit",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", data.meta.title));
    let widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.question_scroll as u16, 0));
    f.render_widget(widget, area);
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, display_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value_flattens_collections() {
        assert_eq!(display_value(&json!("B")), "B");
        assert_eq!(display_value(&json!(["A", "C"])), "A, C");
        assert_eq!(display_value(&json!({"1": "x", "2": "y"})), "1=x, 2=y");
        assert_eq!(display_value(&json!(null)), "-");
    }
}
