use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Style for underscore runs, which passages use as printed answer gaps.
fn gap_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

struct PassageRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    row: Vec<String>,
    cell: String,
    in_table: bool,
    in_head: bool,
}

impl PassageRenderer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default()],
            row: Vec::new(),
            cell: String::new(),
            in_table: false,
            in_head: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let next = f(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn break_line(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank_line(&mut self) {
        self.break_line();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::from(""));
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_table {
            self.cell.push_str(text);
            return;
        }
        let style = self.style();
        let mut rest = text;
        while let Some(start) = rest.find("___") {
            let run = rest[start..].chars().take_while(|c| *c == '_').count();
            if start > 0 {
                self.spans.push(Span::styled(rest[..start].to_string(), style));
            }
            self.spans.push(Span::styled("_".repeat(run), gap_style()));
            rest = &rest[start + run..];
        }
        if !rest.is_empty() {
            self.spans.push(Span::styled(rest.to_string(), style));
        }
    }

    fn html(&mut self, html: &str) {
        let tag = html.trim().trim_start_matches('<').trim_end_matches('>').trim_end_matches('/');
        let name = tag.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
        match name.as_str() {
            "br" => self.break_line(),
            "b" | "strong" => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            "i" | "em" => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            "/b" | "/strong" | "/i" | "/em" => self.pop_style(),
            "p" | "/p" | "div" | "/div" => self.blank_line(),
            _ => {}
        }
    }

    fn end_row(&mut self) {
        let cells = std::mem::take(&mut self.row);
        let style = if self.in_head {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mut spans = Vec::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
            }
            spans.push(Span::styled(cell, style));
        }
        self.lines.push(Line::from(spans));
        if self.in_head {
            self.lines.push(Line::from(Span::styled(
                "─".repeat(24),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => self.break_line(),
            Event::End(TagEnd::Paragraph) => self.blank_line(),
            Event::Start(Tag::Heading { level, .. }) => {
                self.break_line();
                let color = if level == HeadingLevel::H1 { Color::Cyan } else { Color::White };
                self.push_style(|_| Style::default().fg(color).add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.pop_style();
                self.blank_line();
            }
            Event::Start(Tag::Strong) => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Emphasis) => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Event::End(TagEnd::Strong) | Event::End(TagEnd::Emphasis) => self.pop_style(),
            Event::Start(Tag::Item) => {
                self.break_line();
                self.spans.push(Span::raw("  • "));
            }
            Event::End(TagEnd::Item) => self.break_line(),
            Event::End(TagEnd::List(_)) => self.blank_line(),
            Event::Start(Tag::Table(_)) => {
                self.break_line();
                self.in_table = true;
            }
            Event::End(TagEnd::Table) => {
                self.in_table = false;
                self.blank_line();
            }
            Event::Start(Tag::TableHead) => self.in_head = true,
            Event::End(TagEnd::TableHead) => {
                self.end_row();
                self.in_head = false;
            }
            Event::End(TagEnd::TableRow) => self.end_row(),
            Event::End(TagEnd::TableCell) => {
                let cell = std::mem::take(&mut self.cell);
                self.row.push(cell.trim().to_string());
            }
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.spans.push(Span::styled(code.to_string(), style));
            }
            Event::InlineHtml(html) | Event::Html(html) => self.html(&html),
            Event::SoftBreak | Event::HardBreak => self.break_line(),
            Event::Rule => {
                self.break_line();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.break_line();
        self.lines
    }
}

/// Renders passages, instructions, and prompts. Blank lines separate paragraphs.
pub fn markdown_to_lines(text: &str) -> Vec<Line<'static>> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = PassageRenderer::new();
    for event in Parser::new_ext(text, opts) {
        renderer.event(event);
    }
    renderer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_paragraphs_are_separated() {
        let lines = markdown_to_lines("First paragraph.\n\nSecond **bold** one.");
        assert_eq!(plain(&lines), vec!["First paragraph.", "", "Second bold one.", ""]);
        assert!(lines[2].spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_gap_runs_are_highlighted() {
        let lines = markdown_to_lines("The bridge opened in ______ (7).");
        assert_eq!(plain(&lines)[0], "The bridge opened in ______ (7).");
        let gap = lines[0].spans.iter().find(|s| s.content.starts_with('_')).unwrap();
        assert_eq!(gap.style, gap_style());
    }

    #[test]
    fn test_table_rows_keep_columns() {
        let lines = markdown_to_lines("| Year | Event |\n|---|---|\n| 1851 | ____ |\n");
        let text = plain(&lines);
        assert_eq!(text[0], "Year │ Event");
        assert_eq!(text[2], "1851 │ ____");
    }

    #[test]
    fn test_inline_br_breaks_line() {
        let lines = markdown_to_lines("Line one<br>Line two");
        assert_eq!(plain(&lines), vec!["Line one", "Line two", ""]);
    }
}
