use std::io;
use std::time::{Duration, Instant};

use chrono::Utc;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MediaKeyCode, MouseEvent, MouseEventKind, MouseButton,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::Rect;
use ratatui::prelude::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use ieltsroom::audio::AudioCommand;
use ieltsroom::error::AppError;
use ieltsroom::persist::DraftCache;
use ieltsroom::room::RoomEvent;
use ieltsroom::runtime::Dispatcher;

use crate::state::*;

pub fn run_tui(
    mut state: AppState,
    mut dispatcher: Dispatcher,
    mut events: UnboundedReceiver<RoomEvent>,
    cache: DraftCache,
) -> Result<(), AppError> {
    enable_raw_mode().map_err(|e| AppError::Terminal(format!("Cannot enable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| AppError::Terminal(format!("Cannot enter alternate screen: {}", e)))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::Terminal(format!("Cannot create terminal: {}", e)))?;

    let result = main_loop(&mut terminal, &mut state, &mut dispatcher, &mut events, &cache);

    // Restore terminal
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture).ok();

    if !state.room.is_finished() {
        save_draft(&state, &cache);
    }
    result
}

fn main_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    dispatcher: &mut Dispatcher,
    events: &mut UnboundedReceiver<RoomEvent>,
    cache: &DraftCache,
) -> Result<(), AppError> {
    let mut draft_cleared = false;
    loop {
        terminal
            .draw(|f| crate::ui::draw(f, state))
            .map_err(|e| AppError::Terminal(format!("Draw error: {}", e)))?;

        if state.should_quit {
            break;
        }

        // Poll for input events
        if event::poll(Duration::from_millis(100))
            .map_err(|e| AppError::Terminal(format!("Poll error: {}", e)))?
        {
            match event::read().map_err(|e| AppError::Terminal(format!("Read error: {}", e)))? {
                Event::Key(key) => handle_key(key, state, cache),
                Event::Mouse(mouse) => {
                    let size = terminal.size().unwrap_or_default();
                    let area = Rect::new(0, 0, size.width, size.height);
                    handle_mouse(mouse, state, area);
                }
                _ => {}
            }
        }

        let now = Instant::now();

        // Backend results and ticks
        while let Ok(ev) = events.try_recv() {
            state.handle_event(ev, now, Utc::now());
        }

        state.poll_fields(now);
        let due = state.room.flush(now);
        state.queue(due);
        dispatcher.dispatch_all(state.take_commands());
        state.sync_fields(now);

        if state.room.take_draft_dirty() {
            save_draft(state, cache);
        }
        if state.room.is_finished() && !draft_cleared {
            draft_cleared = true;
            state.dialog_stack.clear();
            state.question_scroll = 0;
            if let Err(e) = cache.clear() {
                warn!(error = %e, "cannot remove local draft");
            }
        }
        state.rotate_toast(now);
    }

    Ok(())
}

fn save_draft(state: &AppState, cache: &DraftCache) {
    let submission_id = state.room.engine().submission_id();
    if let Err(e) = cache.save(submission_id, &state.room.draft_answers(), Utc::now()) {
        warn!(error = %e, "cannot write local draft");
    }
}

fn handle_key(key: KeyEvent, state: &mut AppState, cache: &DraftCache) {
    let now = Instant::now();

    // Handle dialog keys first
    if state.has_dialog() {
        handle_dialog_key(key, state, cache, now);
        return;
    }

    if state.room.is_finished() {
        handle_result_key(key, state);
        return;
    }

    handle_working_key(key, state, now);
}

fn handle_result_key(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Enter | KeyCode::Esc => state.should_quit = true,
        KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_quit = true;
        }
        KeyCode::Up | KeyCode::PageUp => {
            state.question_scroll = state.question_scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::PageDown => state.question_scroll += 1,
        _ => {}
    }
}

fn handle_working_key(key: KeyEvent, state: &mut AppState, now: Instant) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global bindings
    if ctrl {
        match key.code {
            KeyCode::Char('q') => {
                state.push_dialog(Dialog::ConfirmQuit);
                return;
            }
            KeyCode::Char('s') => {
                state.request_submit(now);
                return;
            }
            KeyCode::Char('k') => {
                state.request_complete_section(now);
                return;
            }
            KeyCode::Char('f') => {
                state.toggle_mark(now);
                return;
            }
            KeyCode::Char('g') => {
                let next = state.room.engine().section_index() + 1;
                if next < state.room.data().sections.len() {
                    state.navigate_to(next, 0, now);
                }
                return;
            }
            KeyCode::Char('p') => {
                state.audio_toggle(now);
                return;
            }
            KeyCode::Char('r') => {
                state.audio(AudioCommand::Restart, now);
                return;
            }
            KeyCode::Left => {
                state.audio_seek(false, now);
                return;
            }
            KeyCode::Right => {
                state.audio_seek(true, now);
                return;
            }
            KeyCode::Up => {
                state.navigate_prev(now);
                return;
            }
            KeyCode::Down => {
                state.navigate_next(now);
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Media(_) if state.room.suppresses_media_keys() => return,
        KeyCode::Media(MediaKeyCode::PlayPause | MediaKeyCode::Play | MediaKeyCode::Pause) => {
            state.audio_toggle(now);
            return;
        }
        KeyCode::Tab => {
            state.next_slot(now);
            return;
        }
        KeyCode::BackTab => {
            state.prev_slot(now);
            return;
        }
        _ => {}
    }

    // Input-mode-specific bindings
    match state.input_mode {
        InputMode::TextInput => handle_text_input_key(key, state, now),
        InputMode::ChoiceSelect => handle_choice_key(key, state, now),
        InputMode::Navigation => handle_nav_key(key, state, now),
    }
}

fn handle_text_input_key(key: KeyEvent, state: &mut AppState, now: Instant) {
    let is_essay = state.is_essay();

    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.edit_text(now, |field, at| field.insert(c, at));
        }
        KeyCode::Backspace => state.edit_text(now, |field, at| field.backspace(at)),
        KeyCode::Delete => state.edit_text(now, |field, at| field.delete(at)),
        KeyCode::Left => state.move_text_cursor(now, |field| field.move_left()),
        KeyCode::Right => state.move_text_cursor(now, |field| field.move_right()),
        KeyCode::Home => state.move_text_cursor(now, |field| field.move_home()),
        KeyCode::End => state.move_text_cursor(now, |field| field.move_end()),
        KeyCode::Enter => {
            if is_essay {
                state.edit_text(now, |field, at| field.insert('\n', at));
            } else if state.enter_text(now) {
                state.advance(now);
            }
        }
        KeyCode::Up => {
            if is_essay {
                state.question_scroll = state.question_scroll.saturating_sub(1);
            } else {
                state.navigate_prev(now);
            }
        }
        KeyCode::Down => {
            if is_essay {
                state.question_scroll += 1;
            } else {
                state.navigate_next(now);
            }
        }
        KeyCode::Esc => {
            state.blur_current(now);
            state.input_mode = InputMode::Navigation;
        }
        _ => handle_page_keys(key, state),
    }
}

fn handle_choice_key(key: KeyEvent, state: &mut AppState, now: Instant) {
    let choices = state.current_choices().len();
    match key.code {
        KeyCode::Up => state.navigate_prev(now),
        KeyCode::Down => state.navigate_next(now),
        KeyCode::Left => state.choice_cursor = state.choice_cursor.saturating_sub(1),
        KeyCode::Right => {
            if state.choice_cursor + 1 < choices {
                state.choice_cursor += 1;
            }
        }
        KeyCode::Char(' ') if state.room.suppresses_media_keys() => {}
        KeyCode::Char(' ') | KeyCode::Enter => {
            let idx = state.choice_cursor;
            state.select_choice(idx, now);
        }
        KeyCode::Char('?') => state.push_dialog(Dialog::Help),
        KeyCode::Char(c)
            if c.is_ascii_lowercase() && !key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            let idx = (c as u8 - b'a') as usize;
            if idx < choices {
                state.select_choice(idx, now);
            }
        }
        _ => handle_page_keys(key, state),
    }
}

fn handle_nav_key(key: KeyEvent, state: &mut AppState, now: Instant) {
    // Enter or typing a character resumes editing for text slots
    let is_text_slot = state
        .current_slot()
        .is_some_and(|slot| slot.kind == SlotKind::Text);
    if is_text_slot {
        match key.code {
            KeyCode::Enter => {
                state.input_mode = InputMode::TextInput;
                state.move_text_cursor(now, |field| field.focus());
                return;
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) && c != '?' => {
                state.input_mode = InputMode::TextInput;
                state.edit_text(now, |field, at| field.insert(c, at));
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Up | KeyCode::Left => state.navigate_prev(now),
        KeyCode::Down | KeyCode::Right => state.navigate_next(now),
        KeyCode::Char('?') => state.push_dialog(Dialog::Help),
        _ => handle_page_keys(key, state),
    }
}

fn handle_page_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::PageUp => {
            state.question_scroll = state.question_scroll.saturating_sub(5);
        }
        KeyCode::PageDown => state.question_scroll += 5,
        _ => {}
    }
}

fn handle_dialog_key(key: KeyEvent, state: &mut AppState, cache: &DraftCache, now: Instant) {
    let dialog = state.top_dialog().cloned();
    match dialog {
        Some(Dialog::ConfirmSubmit { .. }) => match key.code {
            KeyCode::Enter => {
                state.pop_dialog();
                state.confirm_submit(now);
            }
            KeyCode::Esc => {
                state.pop_dialog();
            }
            _ => {}
        },
        Some(Dialog::ConfirmCompleteSection) => match key.code {
            KeyCode::Enter => {
                state.pop_dialog();
                state.confirm_complete_section(now);
            }
            KeyCode::Esc => {
                state.pop_dialog();
            }
            _ => {}
        },
        Some(Dialog::ConfirmQuit) => match key.code {
            KeyCode::Enter => {
                state.pop_dialog();
                state.blur_current(now);
                save_draft(state, cache);
                info!("quit requested, draft kept locally");
                state.should_quit = true;
            }
            KeyCode::Esc => {
                state.pop_dialog();
            }
            _ => {}
        },
        Some(Dialog::Help) => match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter => {
                state.pop_dialog();
            }
            _ => {}
        },
        None => {}
    }
}

fn handle_mouse(mouse: MouseEvent, state: &mut AppState, size: Rect) {
    if state.has_dialog() || state.room.is_finished() {
        return;
    }

    let now = Instant::now();
    let layout = crate::ui::layout::compute_layout(size, state.room.audio().is_some());
    let x = mouse.column;
    let y = mouse.row;
    let in_sidebar = x >= layout.sidebar.x
        && x < layout.sidebar.x + layout.sidebar.width
        && y >= layout.sidebar.y
        && y < layout.sidebar.y + layout.sidebar.height;
    let in_main = x >= layout.main.x
        && x < layout.main.x + layout.main.width
        && y >= layout.main.y
        && y < layout.main.y + layout.main.height;

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if in_sidebar => {
            let relative_y = y.saturating_sub(layout.sidebar.y + 1) as usize;
            let visible = layout.sidebar.height.saturating_sub(1) as usize;
            let rows = state.sidebar_rows();
            let offset = crate::ui::sidebar::scroll_offset(state.current_sidebar_row(), visible);
            match rows.get(offset + relative_y) {
                Some(SidebarRow::Section(si)) => state.navigate_to(*si, 0, now),
                Some(SidebarRow::Question(si, qi)) => state.navigate_to(*si, *qi, now),
                None => {}
            }
        }
        MouseEventKind::ScrollUp if in_sidebar => state.navigate_prev(now),
        MouseEventKind::ScrollDown if in_sidebar => state.navigate_next(now),
        MouseEventKind::ScrollUp if in_main => {
            state.question_scroll = state.question_scroll.saturating_sub(1);
        }
        MouseEventKind::ScrollDown if in_main => state.question_scroll += 1,
        _ => {}
    }
}
