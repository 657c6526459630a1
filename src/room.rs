//! The exam room: composes engine, synchronizer, clocks, and audio gates.
//!
//! The room is a synchronous state machine. Everything that happens to it
//! arrives as a [`RoomEvent`]; everything it wants done outside arrives at
//! the caller as a [`RoomCommand`]. Network results that show up after the
//! room is gone are simply never delivered.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::answer::Answer;
use crate::audio::{AudioCommand, AudioGate, AudioPolicy, AudioRejection, AudioState};
use crate::engine::{AutoSaveStatus, EngineOptions, ExamEngine, SaveJob, SubmitRequest};
use crate::error::{ApiError, RoomError, SyncError};
use crate::model::{
    ExamStatus, SaveAck, SectionAdvance, SectionStatus, SectionType, Submission, SubmitOutcome,
};
use crate::normalize::{NormalizedData, NormalizedSection};
use crate::sync::{use_status_hook, SectionOutcome, StatusSynchronizer};
use crate::timer::{format_clock, ClockEvent, ClockKind, DeadlineWatch, TimerSource, WARNING_SECS};

const MAX_NOTICES: usize = 8;

#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub practice: bool,
    pub autosave_debounce: Duration,
    pub audio_countdown_secs: u32,
    pub poll_every_secs: u64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            practice: false,
            autosave_debounce: Duration::from_millis(800),
            audio_countdown_secs: 5,
            poll_every_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// One second of wall time.
    Tick,
    SessionStarted(Result<Submission, ApiError>),
    StatusFetched(Result<ExamStatus, ApiError>),
    AnswerSaved {
        question_id: String,
        revision: u64,
        result: Result<SaveAck, ApiError>,
    },
    SectionCompleted(Result<SectionAdvance, ApiError>),
    SectionSwitched(Result<ExamStatus, ApiError>),
    SubmitFinished(Result<SubmitOutcome, ApiError>),
    DeadlineReached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoomCommand {
    StartSession { task_id: i64 },
    PersistAnswer(SaveJob),
    FetchStatus { submission_id: i64 },
    CompleteSection { submission_id: i64, section: SectionType },
    SwitchSection { submission_id: i64, section: SectionType },
    FinalSubmit(SubmitRequest),
    /// Arm the one-shot deadline timer.
    ScheduleDeadline(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitGate {
    NeedsConfirmation {
        incomplete: Vec<String>,
        marked: usize,
    },
    Dispatched(RoomCommand),
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug)]
pub struct ExamRoom {
    engine: ExamEngine,
    sync: StatusSynchronizer,
    deadline: DeadlineWatch,
    audio: HashMap<String, AudioGate>,
    marked: BTreeSet<String>,
    notices: VecDeque<Notice>,
    outcome: Option<SubmitOutcome>,
    settings: RoomSettings,
    secs_since_poll: u64,
    draft_dirty: bool,
    mounted: bool,
    /// A `StartSession` is in flight.
    starting: bool,
    /// The automatic completion at 00:00 failed and is owed a retry.
    retry_complete: bool,
    /// Where the cursor lands once a requested switch is confirmed.
    switch_target: Option<(usize, usize)>,
}

impl ExamRoom {
    pub fn new(data: NormalizedData, settings: RoomSettings) -> Self {
        let official = use_status_hook(&data.meta, settings.practice);
        let clock = if official {
            TimerSource::server()
        } else {
            data.duration_secs()
                .map(TimerSource::local)
                .unwrap_or(TimerSource::Untimed)
        };

        let policy = AudioPolicy {
            strict: official,
            allow_pause: !official && data.meta.allow_audio_pause,
            countdown_secs: settings.audio_countdown_secs,
        };
        let mut audio = HashMap::new();
        for section in &data.sections {
            if section.section_type != Some(SectionType::Listening) {
                continue;
            }
            if let Some(src) = &section.audio_file {
                audio
                    .entry(src.clone())
                    .or_insert_with(|| AudioGate::new(Some(src.clone()), section.audio_duration, policy));
            }
        }

        let deadline = DeadlineWatch::new(data.meta.deadline);
        let options = EngineOptions {
            clock,
            autosave_debounce: settings.autosave_debounce,
            autosave: data.meta.task_id.is_some(),
            practice: settings.practice || data.meta.template_practice,
        };

        Self {
            engine: ExamEngine::new(data, options),
            sync: StatusSynchronizer::new(official),
            deadline,
            audio,
            marked: BTreeSet::new(),
            notices: VecDeque::new(),
            outcome: None,
            settings,
            secs_since_poll: 0,
            draft_dirty: false,
            mounted: false,
            starting: false,
            retry_complete: false,
            switch_target: None,
        }
    }

    /// Entry point once the exam is on screen. A deadline that has already
    /// passed forces submission right here.
    pub fn mount(&mut self, now_utc: DateTime<Utc>) -> Vec<RoomCommand> {
        if self.mounted {
            return Vec::new();
        }
        self.mounted = true;
        let mut commands = Vec::new();

        if self.sync.is_enabled() {
            if let Some(task_id) = self.engine.data().meta.task_id {
                self.starting = true;
                commands.push(RoomCommand::StartSession { task_id });
            }
        }

        if let Some(delay) = self.deadline.delay(now_utc) {
            if delay.is_zero() {
                commands.extend(self.on_deadline(now_utc));
            } else {
                debug!(secs = delay.as_secs(), "deadline scheduled");
                commands.push(RoomCommand::ScheduleDeadline(delay));
            }
        }
        info!(
            official = self.sync.is_enabled(),
            sections = self.engine.data().sections.len(),
            "exam room mounted"
        );
        commands
    }

    /// Reapplies answers kept in the local draft cache. They win over the
    /// server draft and are queued for autosave.
    pub fn restore_local(&mut self, cached: &BTreeMap<String, Answer>, now: Instant) -> usize {
        let restored = self.engine.restore_local(cached, now);
        if restored > 0 {
            info!(restored, "restored answers from local draft");
            self.push_notice(
                NoticeLevel::Info,
                format!("Restored {} unsent answer(s)", restored),
            );
        }
        restored
    }

    /// Whether handling `event` may lock the answers in place (forced
    /// submit, section completion). The owner commits every pending local
    /// edit before passing such an event in.
    pub fn closes_editing(&self, event: &RoomEvent) -> bool {
        match event {
            RoomEvent::Tick => self.time_remaining().is_some_and(|secs| secs <= 1),
            RoomEvent::DeadlineReached => self.deadline.deadline().is_some(),
            RoomEvent::SectionCompleted(Ok(advance)) => advance.success,
            _ => false,
        }
    }

    pub fn handle(&mut self, event: RoomEvent, now: Instant, now_utc: DateTime<Utc>) -> Vec<RoomCommand> {
        match event {
            RoomEvent::Tick => self.on_tick(now),
            RoomEvent::SessionStarted(result) => self.on_session(result),
            RoomEvent::StatusFetched(result) => {
                match result {
                    Ok(status) => self.on_status(status),
                    Err(e) => warn!(error = %e, "status poll failed, retrying on next interval"),
                }
                Vec::new()
            }
            RoomEvent::AnswerSaved {
                question_id,
                revision,
                result,
            } => {
                let failed = result.is_err();
                let was_error = self.engine.autosave_status() == AutoSaveStatus::Error;
                self.engine.finish_save(&question_id, revision, result);
                if failed && !was_error {
                    self.push_notice(
                        NoticeLevel::Warn,
                        "Autosave failed. Your answers are kept and will be resent on your next edit",
                    );
                }
                if let Some(id) = self.engine.submission_id() {
                    self.sync.bind(id);
                }
                self.flush(now)
            }
            RoomEvent::SectionCompleted(result) => {
                let outcome = self.sync.finish_complete_section(result);
                self.on_section_outcome(outcome)
            }
            RoomEvent::SectionSwitched(result) => {
                let outcome = self.sync.finish_switch_section(result);
                self.on_section_outcome(outcome)
            }
            RoomEvent::SubmitFinished(result) => {
                self.on_submit_finished(result);
                Vec::new()
            }
            RoomEvent::DeadlineReached => self.on_deadline(now_utc),
        }
    }

    /// Hands out every autosave whose debounce has elapsed.
    pub fn flush(&mut self, now: Instant) -> Vec<RoomCommand> {
        self.engine
            .take_due_saves(now)
            .into_iter()
            .map(RoomCommand::PersistAnswer)
            .collect()
    }

    // ---- answers ---------------------------------------------------------

    pub fn update_answer(
        &mut self,
        question_id: &str,
        answer: Answer,
        now: Instant,
    ) -> Result<Vec<RoomCommand>, RoomError> {
        if let Some((si, _, _)) = self.engine.data().find(question_id) {
            if !self.is_section_editable(si) {
                return Err(RoomError::SectionLocked);
            }
        }
        self.engine.update_answer(question_id, answer, now)?;
        self.draft_dirty = true;
        Ok(self.flush(now))
    }

    pub fn get_answer(&self, question_id: &str) -> Answer {
        self.engine.get_answer(question_id)
    }

    /// Answers to mirror into the local draft cache.
    pub fn draft_answers(&self) -> BTreeMap<String, Answer> {
        self.engine
            .answers()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// True once after every answer change.
    pub fn take_draft_dirty(&mut self) -> bool {
        std::mem::take(&mut self.draft_dirty)
    }

    pub fn toggle_mark(&mut self, question_id: &str) -> bool {
        if self.marked.remove(question_id) {
            false
        } else {
            self.marked.insert(question_id.to_string());
            true
        }
    }

    pub fn is_marked(&self, question_id: &str) -> bool {
        self.marked.contains(question_id)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    // ---- sections and navigation -----------------------------------------

    pub fn engine(&self) -> &ExamEngine {
        &self.engine
    }

    pub fn sync(&self) -> &StatusSynchronizer {
        &self.sync
    }

    pub fn data(&self) -> &NormalizedData {
        self.engine.data()
    }

    pub fn is_official(&self) -> bool {
        self.sync.is_enabled()
    }

    pub fn section_status(&self, index: usize) -> SectionStatus {
        if !self.sync.is_enabled() {
            return SectionStatus::Available;
        }
        self.section_type(index)
            .and_then(|t| self.sync.section_status(t))
            .unwrap_or(SectionStatus::Locked)
    }

    pub fn is_section_accessible(&self, index: usize) -> bool {
        match self.section_type(index) {
            Some(t) => self.sync.is_section_accessible(t),
            None => !self.sync.is_strict(),
        }
    }

    /// Completed sections are read-only for the rest of the session.
    pub fn is_section_editable(&self, index: usize) -> bool {
        self.is_section_accessible(index) && self.section_status(index) != SectionStatus::Completed
    }

    /// Moves the cursor. Crossing into another section type of an official
    /// exam asks the server first; the cursor follows once it agrees.
    pub fn go_to_section(&mut self, index: usize) -> Result<Vec<RoomCommand>, RoomError> {
        self.go_to_question(index, 0)
    }

    pub fn go_to_question(&mut self, section: usize, question: usize) -> Result<Vec<RoomCommand>, RoomError> {
        if section >= self.data().sections.len() {
            self.engine.go_to_question(section, question);
            return Ok(Vec::new());
        }
        if self.is_local_section(section) {
            self.engine.go_to_question(section, question);
            self.arm_audio();
            return Ok(Vec::new());
        }
        let Some(target) = self.section_type(section) else {
            return Err(RoomError::SectionLocked);
        };
        if !self.sync.is_enabled()
            || self.sync.is_strict()
            || self.section_status(section) == SectionStatus::Completed
        {
            return Err(RoomError::SectionLocked);
        }
        let (submission_id, section_type) = self.sync.begin_switch_section(target)?;
        self.switch_target = Some((section, question));
        Ok(vec![RoomCommand::SwitchSection {
            submission_id,
            section: section_type,
        }])
    }

    /// Next question, moving into the next reachable section at the end of one.
    pub fn next_question(&mut self) -> bool {
        let si = self.engine.section_index();
        let qi = self.engine.question_index();
        let count = self.current_section().map(|s| s.questions.len()).unwrap_or(0);
        if qi + 1 < count {
            self.engine.go_to_question(si, qi + 1);
            return true;
        }
        let next = (si + 1..self.data().sections.len()).find(|&i| self.is_local_section(i));
        match next {
            Some(i) => {
                self.engine.go_to_question(i, 0);
                self.arm_audio();
                true
            }
            None => false,
        }
    }

    pub fn prev_question(&mut self) -> bool {
        let si = self.engine.section_index();
        let qi = self.engine.question_index();
        if qi > 0 {
            self.engine.go_to_question(si, qi - 1);
            return true;
        }
        let prev = (0..si).rev().find(|&i| self.is_local_section(i));
        match prev {
            Some(i) => {
                let last = self.data().sections[i].questions.len().saturating_sub(1);
                self.engine.go_to_question(i, last);
                true
            }
            None => false,
        }
    }

    pub fn current_section(&self) -> Option<&NormalizedSection> {
        self.engine.current_section()
    }

    /// Explicit "finish this section" from the learner.
    pub fn request_complete_section(&mut self) -> Result<Vec<RoomCommand>, RoomError> {
        if !self.sync.is_enabled() {
            return Err(RoomError::NotSynchronized);
        }
        let (submission_id, section) = self.sync.begin_complete_section()?;
        Ok(vec![RoomCommand::CompleteSection {
            submission_id,
            section,
        }])
    }

    // ---- submission --------------------------------------------------------

    /// Learner-initiated submit: asks for confirmation when anything is
    /// incomplete or marked. `forced` skips the question.
    pub fn request_final_submit(&mut self, forced: bool) -> SubmitGate {
        if self.engine.is_submitting() || self.engine.is_submitted() {
            return SubmitGate::Busy;
        }
        if !forced {
            let incomplete = self.engine.incomplete_questions();
            if !incomplete.is_empty() || !self.marked.is_empty() {
                return SubmitGate::NeedsConfirmation {
                    incomplete,
                    marked: self.marked.len(),
                };
            }
        }
        match self.submit(forced) {
            Some(command) => SubmitGate::Dispatched(command),
            None => SubmitGate::Busy,
        }
    }

    /// The learner confirmed the dialog.
    pub fn confirm_final_submit(&mut self) -> SubmitGate {
        match self.submit(false) {
            Some(command) => SubmitGate::Dispatched(command),
            None => SubmitGate::Busy,
        }
    }

    pub fn outcome(&self) -> Option<&SubmitOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    // ---- clock, deadline, audio ------------------------------------------

    pub fn time_remaining(&self) -> Option<u64> {
        self.engine.time_remaining()
    }

    pub fn clock_kind(&self) -> Option<ClockKind> {
        self.engine.clock().kind()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline.deadline()
    }

    /// The player for the current section. Absent unless the section is the
    /// one in progress, so navigation can never bring a recording back.
    pub fn audio(&self) -> Option<&AudioGate> {
        let src = self.visible_audio_source()?;
        self.audio.get(src)
    }

    pub fn audio_command(&mut self, command: AudioCommand) -> Result<AudioState, AudioRejection> {
        let src = self
            .visible_audio_source()
            .map(str::to_string)
            .ok_or(AudioRejection::NotPlaying)?;
        let gate = self.audio.get_mut(&src).ok_or(AudioRejection::NotPlaying)?;
        gate.apply(command)
    }

    /// Space and media keys belong to nobody while a one-shot recording is up.
    pub fn suppresses_media_keys(&self) -> bool {
        self.audio().is_some_and(|gate| gate.policy().strict)
    }

    // ---- notices ---------------------------------------------------------

    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    // ---- internals ---------------------------------------------------------

    fn section_type(&self, index: usize) -> Option<SectionType> {
        self.data().sections.get(index).and_then(|s| s.section_type)
    }

    /// Reachable without asking the server: official exams keep the cursor
    /// inside the section type the server has in progress.
    fn is_local_section(&self, index: usize) -> bool {
        if !self.is_section_accessible(index) {
            return false;
        }
        match (self.sync.is_enabled(), self.section_type(index), self.sync.current_section()) {
            (true, Some(target), Some(current)) => target == current,
            _ => true,
        }
    }

    fn visible_audio_source(&self) -> Option<&str> {
        let section = self.current_section()?;
        if section.section_type != Some(SectionType::Listening) {
            return None;
        }
        if self.sync.is_enabled()
            && self.sync.section_status(SectionType::Listening) != Some(SectionStatus::InProgress)
        {
            return None;
        }
        section.audio_file.as_deref()
    }

    fn arm_audio(&mut self) {
        if let Some(src) = self.visible_audio_source().map(str::to_string) {
            if let Some(gate) = self.audio.get_mut(&src) {
                gate.arm();
            }
        }
    }

    fn submit(&mut self, forced: bool) -> Option<RoomCommand> {
        match self.engine.begin_submit(forced) {
            Ok(request) => Some(RoomCommand::FinalSubmit(request)),
            Err(e) => {
                debug!(error = %e, "final submit skipped");
                None
            }
        }
    }

    fn on_tick(&mut self, now: Instant) -> Vec<RoomCommand> {
        let mut commands = Vec::new();

        if let Some(signal) = self.engine.tick() {
            match (signal.kind, signal.event) {
                (_, ClockEvent::Warning) => self.push_notice(
                    NoticeLevel::Warn,
                    format!("{} remaining", format_clock(WARNING_SECS)),
                ),
                (ClockKind::Local, ClockEvent::ReachedZero) => {
                    self.push_notice(NoticeLevel::Warn, "Time is up. Submitting your answers");
                    commands.extend(self.submit(true));
                }
                (ClockKind::Server, ClockEvent::ReachedZero) => {
                    info!(generation = signal.generation, "section time reached zero");
                    match self.sync.begin_complete_section() {
                        Ok((submission_id, section)) => commands.push(RoomCommand::CompleteSection {
                            submission_id,
                            section,
                        }),
                        Err(SyncError::ActionPending) => self.retry_complete = true,
                        Err(e) => debug!(error = %e, "automatic section completion skipped"),
                    }
                }
            }
        }

        if self.retry_complete && !self.sync.is_action_pending() && self.time_remaining() == Some(0) {
            match self.sync.begin_complete_section() {
                Ok((submission_id, section)) => {
                    info!(?section, "retrying section completion");
                    self.retry_complete = false;
                    commands.push(RoomCommand::CompleteSection {
                        submission_id,
                        section,
                    });
                }
                Err(e) => debug!(error = %e, "section completion retry skipped"),
            }
        }

        self.arm_audio();
        for gate in self.audio.values_mut() {
            gate.tick();
        }

        if self.sync.is_enabled() && !self.engine.is_submitted() {
            match self.sync.submission_id() {
                Some(submission_id) => {
                    self.secs_since_poll += 1;
                    if self.secs_since_poll >= self.settings.poll_every_secs {
                        self.secs_since_poll = 0;
                        commands.push(RoomCommand::FetchStatus { submission_id });
                    }
                }
                None if !self.starting => {
                    self.secs_since_poll += 1;
                    if let Some(task_id) = self.data().meta.task_id {
                        if self.secs_since_poll >= self.settings.poll_every_secs {
                            info!(task = task_id, "retrying exam session start");
                            self.secs_since_poll = 0;
                            self.starting = true;
                            commands.push(RoomCommand::StartSession { task_id });
                        }
                    }
                }
                None => {}
            }
        }

        commands.extend(self.flush(now));
        commands
    }

    fn on_session(&mut self, result: Result<Submission, ApiError>) -> Vec<RoomCommand> {
        self.starting = false;
        let submission = match result {
            Ok(submission) => submission,
            Err(e) => {
                error!(error = %e, "cannot start exam session");
                self.push_notice(
                    NoticeLevel::Error,
                    format!("Could not start the exam session: {}. Retrying", e.user_message()),
                );
                self.secs_since_poll = 0;
                return Vec::new();
            }
        };
        info!(submission = submission.id, status = ?submission.status, "exam session ready");
        self.engine.seed_draft(&submission);
        self.sync.bind(submission.id);
        if submission.status.is_final() {
            self.push_notice(NoticeLevel::Info, "This exam has already been submitted");
            return Vec::new();
        }
        if let Some(secs) = submission.section_time_remaining {
            self.engine.clock_mut().reseed(secs);
        }
        self.secs_since_poll = 0;
        vec![RoomCommand::FetchStatus {
            submission_id: submission.id,
        }]
    }

    fn on_status(&mut self, status: ExamStatus) {
        let Some(delta) = self.sync.apply_status(status) else {
            return;
        };
        let seeded = self.engine.clock().remaining().is_some();
        if let Some(secs) = delta.section_time_remaining {
            if delta.section_changed() || !seeded {
                self.engine.clock_mut().reseed(secs);
            } else {
                self.engine.clock_mut().resync(secs);
            }
        }
        if delta.section_changed() {
            self.retry_complete = false;
            if let Some(index) = delta.current.and_then(|t| self.data().first_section_of(t)) {
                self.engine.go_to_section(index);
            }
        }
        self.arm_audio();
    }

    fn on_section_outcome(&mut self, outcome: SectionOutcome) -> Vec<RoomCommand> {
        match outcome {
            SectionOutcome::Advanced {
                completed,
                next,
                section_time_remaining,
            } => {
                self.retry_complete = false;
                if let Some(secs) = section_time_remaining {
                    self.engine.clock_mut().reseed(secs);
                }
                if let Some(index) = self.data().first_section_of(next) {
                    self.engine.go_to_section(index);
                }
                self.arm_audio();
                self.push_notice(
                    NoticeLevel::Info,
                    format!("{} completed. {} has started", completed, next),
                );
                Vec::new()
            }
            SectionOutcome::ExamComplete { completed } => {
                self.retry_complete = false;
                self.push_notice(NoticeLevel::Info, format!("{} completed. Submitting exam", completed));
                self.submit(true).into_iter().collect()
            }
            SectionOutcome::Switched { to } => {
                self.retry_complete = false;
                if let Some(secs) = self.sync.status().and_then(|s| s.section_time_remaining) {
                    self.engine.clock_mut().reseed(secs);
                }
                let requested = self
                    .switch_target
                    .take()
                    .filter(|&(index, _)| self.section_type(index) == Some(to));
                match requested {
                    Some((section, question)) => self.engine.go_to_question(section, question),
                    None => {
                        if let Some(index) = self.data().first_section_of(to) {
                            self.engine.go_to_section(index);
                        }
                    }
                }
                self.arm_audio();
                Vec::new()
            }
            SectionOutcome::Failed { message } => {
                self.switch_target = None;
                if self.clock_kind() == Some(ClockKind::Server) && self.time_remaining() == Some(0) {
                    // Time is over for this section; completion goes out again on the next tick.
                    self.retry_complete = true;
                }
                self.push_notice(NoticeLevel::Error, message);
                Vec::new()
            }
            SectionOutcome::Ignored => Vec::new(),
        }
    }

    fn on_submit_finished(&mut self, result: Result<SubmitOutcome, ApiError>) {
        self.engine.finish_submit(&result);
        match result {
            Ok(outcome) => {
                info!(practice = outcome.is_practice(), "exam submitted");
                self.push_notice(NoticeLevel::Info, "Answers submitted");
                self.outcome = Some(outcome);
            }
            Err(e) => {
                error!(error = %e, "final submission failed");
                self.push_notice(
                    NoticeLevel::Error,
                    format!("Submission failed: {}. Your answers are kept, try again", e.user_message()),
                );
            }
        }
    }

    fn on_deadline(&mut self, now_utc: DateTime<Utc>) -> Vec<RoomCommand> {
        if !self.deadline.fire(now_utc) {
            return Vec::new();
        }
        info!("task deadline reached");
        self.engine.mark_time_up();
        if self.engine.is_submitting() || self.engine.is_submitted() {
            return Vec::new();
        }
        self.push_notice(NoticeLevel::Warn, "The deadline has passed. Submitting your answers");
        self.submit(true).into_iter().collect()
    }
}
