use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub titlebar: Rect,
    pub sidebar: Rect,
    /// Listening player strip; zero height when no recording is on screen.
    pub audio: Rect,
    pub main: Rect,
    pub statusbar: Rect,
    pub keybar: Rect,
}

pub fn compute_layout(area: Rect, with_audio: bool) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // titlebar
            Constraint::Min(5),    // middle (sidebar + content)
            Constraint::Length(1), // statusbar
            Constraint::Length(1), // keybar
        ])
        .split(area);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30), // sidebar (sections + question labels)
            Constraint::Min(20),    // question pane
        ])
        .split(vertical[1]);

    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if with_audio { 2 } else { 0 }),
            Constraint::Min(3),
        ])
        .split(middle[1]);

    AppLayout {
        titlebar: vertical[0],
        sidebar: middle[0],
        audio: content[0],
        main: content[1],
        statusbar: vertical[2],
        keybar: vertical[3],
    }
}
