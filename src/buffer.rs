//! Local-edit guard shared by every text input.
//!
//! A field keeps its own `local` copy of the value. Upstream values (autosave
//! echoes, draft reloads) are only adopted while the field is neither focused
//! nor dirty, so a background refresh can never revert a keystroke.

use std::time::{Duration, Instant};

/// When a field hands its local value back to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// Blur only.
    Blur,
    /// Blur or Enter (single-line inputs).
    Enter,
    /// Blur or after the field has been idle for the interval (essays).
    Debounce(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Clean,
    Dirty { last_edit: Instant },
    /// Committed; upstream echoes are still ignored until `until`.
    Settling { until: Instant },
}

/// Identifies one input: a question, and optionally a blank/row/sub-number in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub question: String,
    pub slot: Option<String>,
}

impl FieldKey {
    pub fn new(question: impl Into<String>, slot: Option<&str>) -> Self {
        Self {
            question: question.into(),
            slot: slot.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BufferedField {
    trigger: CommitTrigger,
    grace: Duration,
    local: String,
    committed: String,
    cursor: usize,
    focused: bool,
    state: EditState,
    initialized: bool,
}

impl BufferedField {
    pub fn new(trigger: CommitTrigger, grace: Duration) -> Self {
        Self {
            trigger,
            grace,
            local: String::new(),
            committed: String::new(),
            cursor: 0,
            focused: false,
            state: EditState::Clean,
            initialized: false,
        }
    }

    pub fn value(&self) -> &str {
        &self.local
    }

    /// Cursor position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn trigger(&self) -> CommitTrigger {
        self.trigger
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Dirty or still inside the post-commit grace window.
    pub fn is_guarded(&self) -> bool {
        self.focused || self.state != EditState::Clean
    }

    /// Offers an upstream value. Returns true when the local value was replaced.
    pub fn sync(&mut self, upstream: &str, now: Instant) -> bool {
        if !self.initialized {
            self.initialized = true;
            self.adopt(upstream);
            return true;
        }
        self.settle(now);
        if self.is_guarded() {
            return false;
        }
        self.committed = upstream.to_string();
        if self.local == upstream {
            return false;
        }
        self.adopt(upstream);
        true
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self, now: Instant) -> Option<String> {
        self.focused = false;
        self.commit(now)
    }

    /// Enter key. Only single-line fields commit on Enter.
    pub fn enter(&mut self, now: Instant) -> Option<String> {
        match self.trigger {
            CommitTrigger::Enter => self.commit(now),
            _ => None,
        }
    }

    /// Called from the event loop; commits idle debounce fields and ends grace windows.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        self.settle(now);
        match (self.trigger, self.state) {
            (CommitTrigger::Debounce(idle), EditState::Dirty { last_edit })
                if now.saturating_duration_since(last_edit) >= idle =>
            {
                self.commit(now)
            }
            _ => None,
        }
    }

    /// Commits an uncommitted edit right away, whatever the trigger. Focus is kept.
    pub fn flush(&mut self, now: Instant) -> Option<String> {
        match self.state {
            EditState::Dirty { .. } => self.commit(now),
            _ => None,
        }
    }

    pub fn insert(&mut self, c: char, now: Instant) {
        let at = self.byte_at(self.cursor);
        self.local.insert(at, c);
        self.cursor += 1;
        self.touch(now);
    }

    pub fn backspace(&mut self, now: Instant) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.local.remove(at);
        self.touch(now);
    }

    pub fn delete(&mut self, now: Instant) {
        if self.cursor >= self.char_len() {
            return;
        }
        let at = self.byte_at(self.cursor);
        self.local.remove(at);
        self.touch(now);
    }

    /// Replaces the whole local value (paste, choice pick).
    pub fn set(&mut self, value: &str, now: Instant) {
        self.local = value.to_string();
        self.cursor = self.char_len();
        self.touch(now);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn commit(&mut self, now: Instant) -> Option<String> {
        if self.local == self.committed {
            if matches!(self.state, EditState::Dirty { .. }) {
                self.state = EditState::Clean;
            }
            return None;
        }
        self.committed = self.local.clone();
        self.state = EditState::Settling {
            until: now + self.grace,
        };
        Some(self.local.clone())
    }

    fn touch(&mut self, now: Instant) {
        self.focused = true;
        self.initialized = true;
        self.state = EditState::Dirty { last_edit: now };
    }

    fn settle(&mut self, now: Instant) {
        if let EditState::Settling { until } = self.state {
            if now >= until {
                self.state = EditState::Clean;
            }
        }
    }

    fn adopt(&mut self, upstream: &str) {
        self.local = upstream.to_string();
        self.committed = upstream.to_string();
        self.cursor = self.char_len();
    }

    fn char_len(&self) -> usize {
        self.local.chars().count()
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.local
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.local.len())
    }
}
