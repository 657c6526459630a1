use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;

use ieltsroom::answer::{word_count, AnswerFamily};
use ieltsroom::audio::AudioState;
use ieltsroom::buffer::FieldKey;
use ieltsroom::model::Question;
use ieltsroom::timer::format_clock;

use crate::state::{AppState, InputMode, Slot, SlotKind};
use crate::ui::markdown::markdown_to_lines;

const PLACEHOLDER: &str = "Type your answer...";

/// Wrap a styled Line at `width`, preserving span styles across breaks.
fn wrap_styled_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line];
    }

    let total_width: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
    if total_width <= width {
        return vec![line];
    }

    // Flatten into (char, style) pairs
    let mut chars: Vec<(char, Style)> = Vec::new();
    for span in &line.spans {
        for c in span.content.chars() {
            chars.push((c, span.style));
        }
    }

    let mut result: Vec<Line<'static>> = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if chars.len() - pos <= width {
            result.push(styled_chars_to_line(&chars[pos..]));
            break;
        }

        let chunk_end = pos + width;
        let break_at = if chars[chunk_end].0 == ' ' {
            chunk_end
        } else if let Some(sp) = chars[pos..chunk_end].iter().rposition(|(c, _)| *c == ' ') {
            if sp > 0 { pos + sp } else { chunk_end }
        } else {
            chunk_end
        };

        result.push(styled_chars_to_line(&chars[pos..break_at]));
        pos = break_at;
        if pos < chars.len() && chars[pos].0 == ' ' {
            pos += 1;
        }
    }

    if result.is_empty() {
        result.push(Line::from(""));
    }

    result
}

/// Rebuild a Line from (char, style) pairs, grouping consecutive same-style chars into spans.
fn styled_chars_to_line(chars: &[(char, Style)]) -> Line<'static> {
    if chars.is_empty() {
        return Line::from("");
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current_text = String::new();
    let mut current_style = chars[0].1;

    for &(c, style) in chars {
        if style != current_style && !current_text.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut current_text), current_style));
        }
        current_style = style;
        current_text.push(c);
    }
    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, current_style));
    }

    Line::from(spans)
}

/// Word-wrap one logical line into visual rows of (start_char, text).
fn wrap_with_offsets(text: &str, width: usize) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![(0, text.to_string())];
    }

    let mut result: Vec<(usize, String)> = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        if chars.len() - pos <= width {
            result.push((pos, chars[pos..].iter().collect()));
            break;
        }
        let end = pos + width;
        if chars[end] == ' ' {
            result.push((pos, chars[pos..end].iter().collect()));
            pos = end + 1;
        } else if let Some(sp) = chars[pos..end].iter().rposition(|c| *c == ' ').filter(|&sp| sp > 0) {
            result.push((pos, chars[pos..pos + sp].iter().collect()));
            pos += sp + 1;
        } else {
            result.push((pos, chars[pos..end].iter().collect()));
            pos = end;
        }
    }
    result
}

/// Visual (row, col) of a cursor at `cursor_col` chars into a wrapped line.
fn find_visual_cursor(wraps: &[(usize, String)], cursor_col: usize) -> (usize, usize) {
    for (i, (start, text)) in wraps.iter().enumerate() {
        let next_start = wraps.get(i + 1).map_or(usize::MAX, |w| w.0);
        if cursor_col < next_start || i == wraps.len() - 1 {
            return (i, cursor_col.saturating_sub(*start).min(text.chars().count()));
        }
    }
    (0, 0)
}

/// Wrap text to fit within `width` columns, breaking at word boundaries.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            result.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

fn push_markdown(lines: &mut Vec<Line<'static>>, text: &str, width: usize) {
    for line in markdown_to_lines(text) {
        for wline in wrap_styled_line(line, width) {
            lines.push(Line::from(
                std::iter::once(Span::raw("  "))
                    .chain(wline.spans)
                    .collect::<Vec<_>>(),
            ));
        }
    }
}

/// Renders `chars` with a block cursor at `cursor` (chars), padded to `inner`.
fn cursor_spans(text: &str, cursor: Option<usize>, inner: usize) -> Vec<Span<'static>> {
    let chars: Vec<char> = text.chars().take(inner).collect();
    let white = Style::default().fg(Color::White);
    let block = Style::default().fg(Color::Black).bg(Color::White);
    let Some(cursor) = cursor else {
        let shown: String = chars.iter().collect();
        let padding = inner.saturating_sub(chars.len());
        return vec![Span::styled(shown, white), Span::raw(" ".repeat(padding))];
    };
    let col = cursor.min(chars.len());
    let before: String = chars[..col].iter().collect();
    let mut spans = vec![Span::styled(before, white)];
    if col < chars.len() {
        spans.push(Span::styled(chars[col].to_string(), block));
        spans.push(Span::styled(chars[col + 1..].iter().collect::<String>(), white));
        spans.push(Span::raw(" ".repeat(inner.saturating_sub(chars.len()))));
    } else {
        spans.push(Span::styled(" ", block));
        spans.push(Span::raw(" ".repeat(inner.saturating_sub(chars.len() + 1))));
    }
    spans
}

pub fn draw_audio(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(gate) = state.room.audio() else {
        return;
    };
    if area.height == 0 {
        return;
    }

    let duration = gate.duration().unwrap_or(0);
    let (label, color) = match gate.state() {
        AudioState::Idle => ("Recording ready".to_string(), Color::DarkGray),
        AudioState::Countdown { remaining } => {
            (format!("Recording starts in {}s", remaining), Color::Yellow)
        }
        AudioState::Playing { position } => (
            format!("▶ Playing  {} / {}", format_clock(u64::from(position)), format_clock(u64::from(duration))),
            Color::Green,
        ),
        AudioState::Paused { position } => (
            format!("⏸ Paused  {} / {}", format_clock(u64::from(position)), format_clock(u64::from(duration))),
            Color::Cyan,
        ),
        AudioState::Finished => ("■ Recording finished".to_string(), Color::DarkGray),
    };
    let label = if gate.policy().strict {
        format!("{}  (plays once)", label)
    } else {
        label
    };

    let ratio = if duration > 0 {
        (f64::from(gate.position()) / f64::from(duration)).clamp(0.0, 1.0)
    } else if gate.state() == AudioState::Finished {
        1.0
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::BOTTOM))
        .gauge_style(Style::default().fg(color).bg(Color::Rgb(30, 30, 30)))
        .label(label)
        .ratio(ratio);
    f.render_widget(gauge, area);
}

pub fn draw_question(f: &mut Frame, area: Rect, state: &AppState) {
    let (Some(section), Some(question)) = (state.room.current_section(), state.current_question()) else {
        let p = Paragraph::new("No questions").block(Block::default().borders(Borders::ALL));
        f.render_widget(p, area);
        return;
    };

    let width = (area.width as usize).saturating_sub(4); // 2 indent left + 2 margin right
    let mut lines: Vec<Line<'static>> = Vec::new();

    // Header
    lines.push(Line::from(vec![
        Span::styled(
            format!("  {}  ", question.label()),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{} · {}", section.title, question.question_type.label()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    if !state.can_edit() {
        lines.push(Line::from(Span::styled(
            "  Read-only: this section no longer takes answers",
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(Line::from(""));

    if !question.prompt.trim().is_empty() {
        push_markdown(&mut lines, &question.prompt, width);
    }

    let slots = state.current_slots();
    match AnswerFamily::of(question) {
        AnswerFamily::Essay => draw_essay(&mut lines, area, state, question),
        _ if slots.len() == 1 && slots[0].kind == SlotKind::Choice => {
            draw_choices(&mut lines, area, state, &slots[0]);
        }
        _ => draw_slots(&mut lines, area, state, question, &slots),
    }

    // Section material below the answer area
    if !section.instructions.trim().is_empty() || !section.text.trim().is_empty() || !section.images.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  ── {} {}", section.title, "─".repeat(width.saturating_sub(section.title.chars().count() + 4))),
            Style::default().fg(Color::DarkGray),
        )));
        if !section.instructions.trim().is_empty() {
            push_markdown(&mut lines, &section.instructions, width);
        }
        if !section.text.trim().is_empty() {
            push_markdown(&mut lines, &section.text, width);
        }
        for image in &section.images {
            lines.push(Line::from(Span::styled(
                format!("  [image] {}", image),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    // Apply scroll with clamping
    let total_content_lines = lines.len();
    let visible_height = area.height as usize;
    let scroll = state.question_scroll.min(total_content_lines.saturating_sub(visible_height));
    let display_lines: Vec<Line> = lines.into_iter().skip(scroll).collect();

    let widget = Paragraph::new(display_lines);
    f.render_widget(widget, area);

    if total_content_lines > visible_height {
        let mut scrollbar_state = ScrollbarState::new(total_content_lines)
            .position(scroll)
            .viewport_content_length(visible_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn draw_choices(lines: &mut Vec<Line<'static>>, area: Rect, state: &AppState, slot: &Slot) {
    let multi = state
        .current_question()
        .is_some_and(|q| AnswerFamily::of(q) == AnswerFamily::Multi);
    lines.push(Line::from(""));
    if multi {
        if let Some(q) = state.current_question() {
            lines.push(Line::from(Span::styled(
                format!("  Choose {}", q.select_count()),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    for (i, choice) in state.current_choices().iter().enumerate() {
        let is_selected = state.is_choice_selected(slot, choice);
        let marker = match (multi, is_selected) {
            (true, true) => "[x]",
            (true, false) => "[ ]",
            (false, true) => "(●)",
            (false, false) => "( )",
        };
        let cursor = if i == state.choice_cursor && state.input_mode == InputMode::ChoiceSelect {
            "▸"
        } else {
            " "
        };
        let style = if is_selected {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        let text = if choice.text.is_empty() {
            choice.key.clone()
        } else {
            choice.text.clone()
        };
        let prefix = format!(" {}{} {}. ", cursor, marker, choice_letter(i));
        let prefix_len = prefix.chars().count();
        let text_width = (area.width as usize).saturating_sub(prefix_len + 1);
        for (li, wline) in wrap_text(&text, text_width).into_iter().enumerate() {
            let lead = if li == 0 {
                Span::styled(prefix.clone(), style)
            } else {
                Span::raw(" ".repeat(prefix_len))
            };
            lines.push(Line::from(vec![lead, Span::styled(wline, style)]));
        }
    }
}

fn draw_slots(lines: &mut Vec<Line<'static>>, area: Rect, state: &AppState, question: &Question, slots: &[Slot]) {
    let answer = state.room.get_answer(&question.key());
    let choices = state.current_choices();
    let dashes = area.width.saturating_sub(6) as usize;
    let inner = area.width.saturating_sub(8) as usize;
    lines.push(Line::from(""));

    for (i, slot) in slots.iter().enumerate() {
        let is_current = i == state.slot_cursor;
        let label_style = if is_current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let label = if slot.label.is_empty() && slots.len() == 1 {
            "Answer".to_string()
        } else if slot.label.is_empty() {
            format!("Item {}", i + 1)
        } else {
            slot.label.clone()
        };

        match slot.kind {
            SlotKind::Choice => {
                let value = answer.slot(slot.key.as_deref());
                let shown = choices
                    .iter()
                    .find(|c| c.key == value)
                    .map(|c| {
                        if c.text.is_empty() {
                            c.key.clone()
                        } else {
                            format!("{}. {}", c.key, c.text)
                        }
                    })
                    .unwrap_or_else(|| "—".to_string());
                lines.push(Line::from(vec![
                    Span::styled(if is_current { "  ▸ " } else { "    " }, label_style),
                    Span::styled(format!("{}: ", label), label_style),
                    Span::styled(
                        shown,
                        if value.is_empty() {
                            Style::default().fg(Color::DarkGray)
                        } else {
                            Style::default().fg(Color::Green)
                        },
                    ),
                ]));
            }
            SlotKind::Text => {
                let key = FieldKey::new(question.key(), slot.key.as_deref());
                let field = state.field(&key);
                let is_editing = is_current
                    && state.input_mode == InputMode::TextInput
                    && field.is_some_and(|f| f.is_focused());
                let value = field
                    .map(|f| f.value().to_string())
                    .unwrap_or_else(|| answer.slot(slot.key.as_deref()).to_string());

                lines.push(Line::from(vec![
                    Span::styled(if is_current { "  ▸ " } else { "    " }, label_style),
                    Span::styled(label, label_style),
                ]));
                lines.push(Line::from(format!("  ┌{}┐", "─".repeat(dashes))));
                let mut spans = vec![Span::raw("  │ ")];
                if value.is_empty() && !is_editing {
                    spans.push(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)));
                    spans.push(Span::raw(" ".repeat(inner.saturating_sub(PLACEHOLDER.len()))));
                } else {
                    let cursor = if is_editing { field.map(|f| f.cursor()) } else { None };
                    spans.extend(cursor_spans(&value, cursor, inner));
                }
                spans.push(Span::raw(" │"));
                lines.push(Line::from(spans));
                lines.push(Line::from(format!("  └{}┘", "─".repeat(dashes))));
            }
        }
    }

    // Options for the choice slot under the cursor
    if let Some(slot) = slots.get(state.slot_cursor).filter(|s| s.kind == SlotKind::Choice) {
        lines.push(Line::from(""));
        let text_width = (area.width as usize).saturating_sub(10);
        for (i, choice) in choices.iter().enumerate() {
            let is_selected = state.is_choice_selected(slot, choice);
            let cursor = if i == state.choice_cursor { "▸" } else { " " };
            let style = if is_selected {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            let text = if choice.text.is_empty() { choice.key.clone() } else { choice.text.clone() };
            let prefix = format!("   {} {}. ", cursor, choice_letter(i));
            for (li, wline) in wrap_text(&text, text_width).into_iter().enumerate() {
                let lead = if li == 0 {
                    Span::styled(prefix.clone(), style)
                } else {
                    Span::raw(" ".repeat(prefix.chars().count()))
                };
                lines.push(Line::from(vec![lead, Span::styled(wline, style)]));
            }
        }
    }
}

fn draw_essay(lines: &mut Vec<Line<'static>>, area: Rect, state: &AppState, question: &Question) {
    let key = FieldKey::new(question.key(), None);
    let field = state.field(&key);
    let is_editing = state.input_mode == InputMode::TextInput && field.is_some_and(|f| f.is_focused());
    let text = field
        .map(|f| f.value().to_string())
        .unwrap_or_else(|| state.room.get_answer(&question.key()).slot(None).to_string());

    let words = word_count(&text);
    let target = match question.min_words() {
        Some(min) => format!("{} words (min {})", words, min),
        None => format!("{} words", words),
    };
    let short = question.min_words().is_some_and(|min| words < min);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("  {}", target),
        Style::default().fg(if short { Color::Yellow } else { Color::Green }),
    )));

    let dashes = area.width.saturating_sub(6) as usize;
    let inner_w = area.width.saturating_sub(8) as usize;
    let editor_rows = (area.height as usize).saturating_sub(lines.len() + 2).clamp(3, 20);

    // Cursor as (logical row, col) in chars
    let (cursor_row, cursor_col) = match field.filter(|_| is_editing) {
        Some(f) => {
            let before: String = text.chars().take(f.cursor()).collect();
            let row = before.matches('\n').count();
            let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count());
            (row, col)
        }
        None => (0, 0),
    };

    let mut visual_rows: Vec<String> = Vec::new();
    let mut cursor_vrow = 0;
    let mut cursor_vcol = 0;
    for (li, line_text) in text.split('\n').enumerate() {
        let wraps = wrap_with_offsets(line_text, inner_w);
        if is_editing && li == cursor_row {
            let (vr, vc) = find_visual_cursor(&wraps, cursor_col);
            cursor_vrow = visual_rows.len() + vr;
            cursor_vcol = vc;
        }
        visual_rows.extend(wraps.into_iter().map(|(_, row)| row));
    }

    lines.push(Line::from(format!("  ┌{}┐", "─".repeat(dashes))));
    let scroll = (cursor_vrow + 1).saturating_sub(editor_rows);
    for vi in 0..editor_rows {
        let row_idx = scroll + vi;
        let mut spans = vec![Span::raw("  │ ")];
        match visual_rows.get(row_idx) {
            Some(_) if row_idx == 0 && text.is_empty() && !is_editing => {
                spans.push(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)));
                spans.push(Span::raw(" ".repeat(inner_w.saturating_sub(PLACEHOLDER.len()))));
            }
            Some(row) => {
                let cursor = (is_editing && row_idx == cursor_vrow).then_some(cursor_vcol);
                spans.extend(cursor_spans(row, cursor, inner_w));
            }
            None => spans.push(Span::raw(" ".repeat(inner_w))),
        }
        spans.push(Span::raw(" │"));
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(format!("  └{}┘", "─".repeat(dashes))));
}

fn choice_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_breaks_on_words() {
        let rows = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(rows, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_wrap_with_offsets_tracks_char_positions() {
        let rows = wrap_with_offsets("café au lait chaud", 8);
        assert_eq!(rows[0], (0, "café au".to_string()));
        assert_eq!(rows[1].0, 8);
        let (row, col) = find_visual_cursor(&rows, 10);
        assert_eq!((row, col), (1, 2));
    }
}
