use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use ieltsroom::answer::{AnswerFamily, keyed_by_number};
use ieltsroom::audio::{AudioCommand, AudioState};
use ieltsroom::buffer::{BufferedField, CommitTrigger, FieldKey};
use ieltsroom::model::{ChoiceOption, Question, QuestionType};
use ieltsroom::room::{ExamRoom, Notice, NoticeLevel, RoomCommand, RoomEvent, SubmitGate};

const TOAST_SECS: u64 = 4;
const SEEK_STEP_SECS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    ConfirmSubmit { incomplete: Vec<String>, marked: usize },
    ConfirmCompleteSection,
    ConfirmQuit,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Navigation,
    ChoiceSelect,
    TextInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotKind {
    Choice,
    Text,
}

/// One answerable input inside a question: the whole question, a blank, a
/// sub-number, a map region, or a matching row.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub key: Option<String>,
    pub label: String,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SidebarRow {
    Section(usize),
    Question(usize, usize),
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub notice: Notice,
    pub shown_at: Instant,
}

pub struct AppState {
    pub room: ExamRoom,
    pub fields: HashMap<FieldKey, BufferedField>,
    pub input_mode: InputMode,
    pub dialog_stack: Vec<Dialog>,
    pub choice_cursor: usize,
    pub slot_cursor: usize,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub question_scroll: usize,
    grace: Duration,
    essay_debounce: Duration,
    outbox: Vec<RoomCommand>,
}

impl AppState {
    pub fn new(room: ExamRoom, grace: Duration, essay_debounce: Duration) -> Self {
        let mut state = Self {
            room,
            fields: HashMap::new(),
            input_mode: InputMode::Navigation,
            dialog_stack: Vec::new(),
            choice_cursor: 0,
            slot_cursor: 0,
            toast: None,
            should_quit: false,
            question_scroll: 0,
            grace,
            essay_debounce,
            outbox: Vec::new(),
        };
        state.update_input_mode();
        state
    }

    /// Commands produced by user actions since the last call.
    pub fn take_commands(&mut self) -> Vec<RoomCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn queue(&mut self, commands: impl IntoIterator<Item = RoomCommand>) {
        self.outbox.extend(commands);
    }

    /// Feeds a tick or backend result to the room. Typing that has not been
    /// committed yet goes in first when the event can close the answers.
    pub fn handle_event(&mut self, event: RoomEvent, now: Instant, now_utc: DateTime<Utc>) {
        if self.room.closes_editing(&event) {
            self.flush_fields(now);
        }
        let engine = self.room.engine();
        let cursor = (engine.section_index(), engine.question_index());
        let commands = self.room.handle(event, now, now_utc);
        self.queue(commands);
        let engine = self.room.engine();
        if cursor != (engine.section_index(), engine.question_index()) {
            self.reset_question_view();
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.room.engine().current_question()
    }

    pub fn current_slots(&self) -> Vec<Slot> {
        self.current_question().map(slots_for).unwrap_or_default()
    }

    pub fn current_slot(&self) -> Option<Slot> {
        self.current_slots().into_iter().nth(self.slot_cursor)
    }

    pub fn current_field_key(&self) -> Option<FieldKey> {
        let q = self.current_question()?;
        let slot = self.current_slot()?;
        Some(FieldKey::new(q.key(), slot.key.as_deref()))
    }

    pub fn is_essay(&self) -> bool {
        self.current_question()
            .is_some_and(|q| q.question_type == QuestionType::Essay)
    }

    /// Whether the current section still takes answers.
    pub fn can_edit(&self) -> bool {
        let si = self.room.engine().section_index();
        self.room.is_section_editable(si)
            && !self.room.engine().is_time_up()
            && !self.room.engine().is_submitting()
            && !self.room.engine().is_submitted()
    }

    // ---- text fields -----------------------------------------------------

    pub fn field(&self, key: &FieldKey) -> Option<&BufferedField> {
        self.fields.get(key)
    }

    fn field_mut(&mut self, key: &FieldKey, now: Instant) -> &mut BufferedField {
        let essay = self
            .room
            .data()
            .find(&key.question)
            .is_some_and(|(_, _, q)| q.question_type == QuestionType::Essay);
        let upstream = self
            .room
            .get_answer(&key.question)
            .slot(key.slot.as_deref())
            .to_string();
        let trigger = if essay {
            CommitTrigger::Debounce(self.essay_debounce)
        } else {
            CommitTrigger::Enter
        };
        let grace = self.grace;
        self.fields.entry(key.clone()).or_insert_with(|| {
            let mut field = BufferedField::new(trigger, grace);
            field.sync(&upstream, now);
            field
        })
    }

    /// Offers the engine's current values to every field that is not guarded.
    pub fn sync_fields(&mut self, now: Instant) {
        let room = &self.room;
        for (key, field) in self.fields.iter_mut() {
            let upstream = room.get_answer(&key.question);
            field.sync(upstream.slot(key.slot.as_deref()), now);
        }
    }

    /// Commits essays that have been idle long enough.
    pub fn poll_fields(&mut self, now: Instant) {
        let due: Vec<(FieldKey, String)> = self
            .fields
            .iter_mut()
            .filter_map(|(key, field)| field.poll(now).map(|value| (key.clone(), value)))
            .collect();
        for (key, value) in due {
            self.commit_text(&key, &value, now);
        }
    }

    /// Commits every field holding an uncommitted edit.
    pub fn flush_fields(&mut self, now: Instant) {
        let pending: Vec<(FieldKey, String)> = self
            .fields
            .iter_mut()
            .filter_map(|(key, field)| field.flush(now).map(|value| (key.clone(), value)))
            .collect();
        for (key, value) in pending {
            self.commit_text(&key, &value, now);
        }
    }

    pub fn edit_text(&mut self, now: Instant, edit: impl FnOnce(&mut BufferedField, Instant)) {
        if !self.can_edit() {
            self.notify(NoticeLevel::Warn, "This section is read-only", now);
            return;
        }
        let Some(key) = self.current_field_key() else {
            return;
        };
        let field = self.field_mut(&key, now);
        field.focus();
        edit(field, now);
    }

    pub fn move_text_cursor(&mut self, now: Instant, step: impl FnOnce(&mut BufferedField)) {
        if let Some(key) = self.current_field_key() {
            step(self.field_mut(&key, now));
        }
    }

    /// Enter on a single-line field: commit and report whether it was one.
    pub fn enter_text(&mut self, now: Instant) -> bool {
        let Some(key) = self.current_field_key() else {
            return false;
        };
        let field = self.field_mut(&key, now);
        if field.trigger() != CommitTrigger::Enter {
            return false;
        }
        if let Some(value) = field.enter(now) {
            self.commit_text(&key, &value, now);
        }
        true
    }

    pub fn blur_current(&mut self, now: Instant) {
        let Some(key) = self.current_field_key() else {
            return;
        };
        let committed = match self.fields.get_mut(&key) {
            Some(field) => field.blur(now),
            None => None,
        };
        if let Some(value) = committed {
            self.commit_text(&key, &value, now);
        }
    }

    fn commit_text(&mut self, key: &FieldKey, value: &str, now: Instant) {
        let answer = self
            .room
            .get_answer(&key.question)
            .with_slot(key.slot.as_deref(), value);
        match self.room.update_answer(&key.question, answer, now) {
            Ok(commands) => self.queue(commands),
            Err(e) => self.notify(NoticeLevel::Warn, format!("Answer not saved: {}", e), now),
        }
    }

    // ---- choices ---------------------------------------------------------

    pub fn current_choices(&self) -> Vec<ChoiceOption> {
        self.current_question().map(choice_list).unwrap_or_default()
    }

    pub fn select_choice(&mut self, idx: usize, now: Instant) {
        let Some(q) = self.current_question().cloned() else {
            return;
        };
        let Some(slot) = self.current_slot() else {
            return;
        };
        let choices = choice_list(&q);
        let Some(choice) = choices.get(idx) else {
            return;
        };
        if !self.can_edit() {
            self.notify(NoticeLevel::Warn, "This section is read-only", now);
            return;
        }
        self.choice_cursor = idx;
        let current = self.room.get_answer(&q.key());
        let next = if AnswerFamily::of(&q) == AnswerFamily::Multi {
            current.toggle_choice(&choice.key)
        } else if current.slot(slot.key.as_deref()) == choice.key {
            current.with_slot(slot.key.as_deref(), "")
        } else {
            current.with_slot(slot.key.as_deref(), &choice.key)
        };
        match self.room.update_answer(&q.key(), next, now) {
            Ok(commands) => self.queue(commands),
            Err(e) => self.notify(NoticeLevel::Warn, format!("Answer not saved: {}", e), now),
        }
    }

    pub fn is_choice_selected(&self, slot: &Slot, choice: &ChoiceOption) -> bool {
        let Some(q) = self.current_question() else {
            return false;
        };
        let answer = self.room.get_answer(&q.key());
        if AnswerFamily::of(q) == AnswerFamily::Multi {
            return answer.has_choice(&choice.key);
        }
        answer.slot(slot.key.as_deref()) == choice.key
    }

    // ---- navigation ------------------------------------------------------

    pub fn navigate_to(&mut self, section: usize, question: usize, now: Instant) {
        self.blur_current(now);
        match self.room.go_to_question(section, question) {
            Ok(commands) => {
                if !commands.is_empty() {
                    self.notify(NoticeLevel::Info, "Switching section...", now);
                }
                self.queue(commands);
            }
            Err(e) => self.notify(NoticeLevel::Warn, e.to_string(), now),
        }
        self.reset_question_view();
    }

    pub fn navigate_next(&mut self, now: Instant) {
        self.blur_current(now);
        if self.room.next_question() {
            self.reset_question_view();
        }
    }

    pub fn navigate_prev(&mut self, now: Instant) {
        self.blur_current(now);
        if self.room.prev_question() {
            self.reset_question_view();
        }
    }

    pub fn next_slot(&mut self, now: Instant) {
        let count = self.current_slots().len();
        if count <= 1 {
            return;
        }
        self.blur_current(now);
        self.slot_cursor = (self.slot_cursor + 1) % count;
        self.choice_cursor = 0;
        self.update_input_mode();
    }

    pub fn prev_slot(&mut self, now: Instant) {
        let count = self.current_slots().len();
        if count <= 1 {
            return;
        }
        self.blur_current(now);
        self.slot_cursor = (self.slot_cursor + count - 1) % count;
        self.choice_cursor = 0;
        self.update_input_mode();
    }

    /// Moves forward one slot, or to the next question after the last slot.
    pub fn advance(&mut self, now: Instant) {
        if self.slot_cursor + 1 < self.current_slots().len() {
            self.next_slot(now);
        } else {
            self.navigate_next(now);
        }
    }

    fn reset_question_view(&mut self) {
        self.slot_cursor = 0;
        self.choice_cursor = 0;
        self.question_scroll = 0;
        self.update_input_mode();
    }

    pub fn update_input_mode(&mut self) {
        self.input_mode = match self.current_slot().map(|s| s.kind) {
            Some(SlotKind::Choice) => InputMode::ChoiceSelect,
            Some(SlotKind::Text) if !self.is_essay() => InputMode::TextInput,
            _ => InputMode::Navigation,
        };
    }

    /// Sections and their questions, flattened for the sidebar.
    pub fn sidebar_rows(&self) -> Vec<SidebarRow> {
        let mut rows = Vec::new();
        for (si, section) in self.room.data().sections.iter().enumerate() {
            rows.push(SidebarRow::Section(si));
            for qi in 0..section.questions.len() {
                rows.push(SidebarRow::Question(si, qi));
            }
        }
        rows
    }

    pub fn current_sidebar_row(&self) -> usize {
        let target = SidebarRow::Question(
            self.room.engine().section_index(),
            self.room.engine().question_index(),
        );
        self.sidebar_rows()
            .iter()
            .position(|r| *r == target)
            .unwrap_or(0)
    }

    // ---- section, submit, audio ------------------------------------------

    pub fn request_submit(&mut self, now: Instant) {
        self.blur_current(now);
        match self.room.request_final_submit(false) {
            SubmitGate::NeedsConfirmation { incomplete, marked } => {
                self.push_dialog(Dialog::ConfirmSubmit { incomplete, marked });
            }
            SubmitGate::Dispatched(command) => self.queue([command]),
            SubmitGate::Busy => self.notify(NoticeLevel::Info, "Submission already in progress", now),
        }
    }

    pub fn confirm_submit(&mut self, now: Instant) {
        match self.room.confirm_final_submit() {
            SubmitGate::Dispatched(command) => self.queue([command]),
            _ => self.notify(NoticeLevel::Info, "Submission already in progress", now),
        }
    }

    pub fn request_complete_section(&mut self, now: Instant) {
        if !self.room.is_official() {
            self.notify(NoticeLevel::Info, "Sections are free to move between in practice", now);
            return;
        }
        self.push_dialog(Dialog::ConfirmCompleteSection);
    }

    pub fn confirm_complete_section(&mut self, now: Instant) {
        self.blur_current(now);
        match self.room.request_complete_section() {
            Ok(commands) => self.queue(commands),
            Err(e) => self.notify(NoticeLevel::Warn, e.to_string(), now),
        }
    }

    pub fn toggle_mark(&mut self, now: Instant) {
        let Some(key) = self.current_question().map(|q| q.key()) else {
            return;
        };
        let marked = self.room.toggle_mark(&key);
        let message = if marked { "Marked for review" } else { "Mark removed" };
        self.notify(NoticeLevel::Info, message, now);
    }

    pub fn audio(&mut self, command: AudioCommand, now: Instant) {
        if let Err(e) = self.room.audio_command(command) {
            self.notify(NoticeLevel::Warn, format!("Audio: {}", e), now);
        }
    }

    pub fn audio_toggle(&mut self, now: Instant) {
        let playing = self
            .room
            .audio()
            .is_some_and(|gate| matches!(gate.state(), AudioState::Playing { .. }));
        let command = if playing {
            AudioCommand::Pause
        } else {
            AudioCommand::Play
        };
        self.audio(command, now);
    }

    pub fn audio_seek(&mut self, forward: bool, now: Instant) {
        let Some(position) = self.room.audio().map(|gate| gate.position()) else {
            return;
        };
        let target = if forward {
            position + SEEK_STEP_SECS
        } else {
            position.saturating_sub(SEEK_STEP_SECS)
        };
        self.audio(AudioCommand::Seek(target), now);
    }

    // ---- notices and dialogs ---------------------------------------------

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        self.room.push_notice(level, message);
        self.rotate_toast(now);
    }

    /// Shows the next queued notice once the current toast has expired.
    pub fn rotate_toast(&mut self, now: Instant) {
        let expired = self.toast.as_ref().map_or(true, |t| {
            now.saturating_duration_since(t.shown_at) >= Duration::from_secs(TOAST_SECS)
        });
        if !expired {
            return;
        }
        self.toast = self.room.take_notice().map(|notice| Toast {
            notice,
            shown_at: now,
        });
    }

    pub fn has_dialog(&self) -> bool {
        !self.dialog_stack.is_empty()
    }

    pub fn top_dialog(&self) -> Option<&Dialog> {
        self.dialog_stack.last()
    }

    pub fn push_dialog(&mut self, dialog: Dialog) {
        self.dialog_stack.push(dialog);
    }

    pub fn pop_dialog(&mut self) -> Option<Dialog> {
        self.dialog_stack.pop()
    }
}

/// Options a choice slot picks from.
pub fn choice_list(question: &Question) -> Vec<ChoiceOption> {
    match question.question_type {
        QuestionType::SummaryDragDrop | QuestionType::MapLabelling => question.word_bank(),
        _ => question.options(),
    }
}

pub fn slots_for(question: &Question) -> Vec<Slot> {
    let single = |kind| {
        vec![Slot {
            key: None,
            label: String::new(),
            kind,
        }]
    };
    match AnswerFamily::of(question) {
        AnswerFamily::Single => match question.question_type {
            QuestionType::ShortAnswer => single(SlotKind::Text),
            _ => single(SlotKind::Choice),
        },
        AnswerFamily::Multi => single(SlotKind::Choice),
        AnswerFamily::Essay => single(SlotKind::Text),
        AnswerFamily::Keyed if keyed_by_number(question) => {
            let kind = if question.question_type == QuestionType::ShortAnswer {
                SlotKind::Text
            } else {
                SlotKind::Choice
            };
            question
                .sub_keys()
                .into_iter()
                .map(|k| Slot {
                    label: format!("Q{}", k),
                    key: Some(k),
                    kind,
                })
                .collect()
        }
        AnswerFamily::Keyed => {
            let kind = if question.question_type == QuestionType::SummaryDragDrop {
                SlotKind::Choice
            } else {
                SlotKind::Text
            };
            question
                .blanks()
                .into_iter()
                .map(|b| Slot {
                    key: Some(b.id),
                    label: b.label,
                    kind,
                })
                .collect()
        }
        AnswerFamily::Labels => question
            .regions()
            .into_iter()
            .map(|r| Slot {
                key: Some(r.id),
                label: r.label,
                kind: SlotKind::Choice,
            })
            .collect(),
        AnswerFamily::Matching => question
            .rows()
            .into_iter()
            .map(|r| Slot {
                key: Some(r.id),
                label: r.text,
                kind: SlotKind::Choice,
            })
            .collect(),
    }
}
