//! Exam engine: the single owner of answers, cursors, the live clock, and
//! the autosave/submission bookkeeping.
//!
//! The engine performs no I/O. It hands out [`SaveJob`]s and a
//! [`SubmitRequest`] and is told about their results afterwards, which keeps
//! it usable from both the terminal event loop and tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::answer::{is_answered, is_fully_answered, Answer};
use crate::error::{ApiError, EngineError};
use crate::model::{Question, SaveAck, Submission, SubmitOutcome};
use crate::normalize::{NormalizedData, NormalizedSection};
use crate::timer::{ClockEvent, ClockKind, ClockSignal, TimerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

/// One debounced answer write.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub submission_id: Option<i64>,
    pub task_id: Option<i64>,
    pub question_id: String,
    pub answer: Answer,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub submission_id: Option<i64>,
    pub task_id: Option<i64>,
    pub mock_ids: Vec<i64>,
    pub answers: BTreeMap<String, Answer>,
    pub forced: bool,
    pub practice: bool,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub clock: TimerSource,
    pub autosave_debounce: Duration,
    /// Template practice has no server draft to write into.
    pub autosave: bool,
    pub practice: bool,
}

#[derive(Debug, Clone)]
pub struct ExamEngine {
    data: NormalizedData,
    answers: HashMap<String, Answer>,
    section_index: usize,
    question_index: usize,
    clock: TimerSource,
    time_up: bool,
    autosave_status: AutoSaveStatus,
    autosave_enabled: bool,
    debounce: Duration,
    practice: bool,
    submission_id: Option<i64>,
    revisions: HashMap<String, u64>,
    pending: HashMap<String, Instant>,
    in_flight: HashMap<String, u64>,
    failed: HashSet<String>,
    submitting: bool,
    submitted: bool,
}

impl ExamEngine {
    pub fn new(data: NormalizedData, options: EngineOptions) -> Self {
        Self {
            data,
            answers: HashMap::new(),
            section_index: 0,
            question_index: 0,
            clock: options.clock,
            time_up: false,
            autosave_status: AutoSaveStatus::Idle,
            autosave_enabled: options.autosave,
            debounce: options.autosave_debounce,
            practice: options.practice,
            submission_id: None,
            revisions: HashMap::new(),
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            failed: HashSet::new(),
            submitting: false,
            submitted: false,
        }
    }

    pub fn data(&self) -> &NormalizedData {
        &self.data
    }

    pub fn is_practice(&self) -> bool {
        self.practice
    }

    // ---- answers -------------------------------------------------------

    /// Adopts a server draft. Questions that already hold a local answer keep it.
    pub fn seed_draft(&mut self, draft: &Submission) -> Vec<String> {
        self.submission_id.get_or_insert(draft.id);
        if draft.status.is_final() {
            self.submitted = true;
        }
        let mut adopted = Vec::new();
        for (key, answer) in &draft.answers {
            let Some((_, _, question)) = self.data.find(key) else {
                warn!(question = %key, "draft answer for unknown question dropped");
                continue;
            };
            if !answer.fits(question) || self.answers.contains_key(key) {
                continue;
            }
            self.answers.insert(key.clone(), answer.clone());
            adopted.push(key.clone());
        }
        debug!(submission = draft.id, adopted = adopted.len(), "seeded draft answers");
        adopted
    }

    /// Restores answers from the local draft cache and queues them for saving.
    pub fn restore_local(&mut self, cached: &BTreeMap<String, Answer>, now: Instant) -> usize {
        let mut restored = 0;
        for (key, answer) in cached {
            let fits = self
                .data
                .find(key)
                .is_some_and(|(_, _, q)| answer.fits(q));
            if !fits {
                continue;
            }
            self.answers.insert(key.clone(), answer.clone());
            *self.revisions.entry(key.clone()).or_insert(0) += 1;
            if self.autosave_enabled {
                self.pending.insert(key.clone(), now + self.debounce);
            }
            restored += 1;
        }
        restored
    }

    /// Replaces one question's answer and schedules a debounced save.
    pub fn update_answer(
        &mut self,
        question_id: &str,
        answer: Answer,
        now: Instant,
    ) -> Result<(), EngineError> {
        if self.submitted {
            return Err(EngineError::Submitted);
        }
        if self.time_up {
            return Err(EngineError::TimeUp);
        }
        let Some((_, _, question)) = self.data.find(question_id) else {
            return Err(EngineError::UnknownQuestion(question_id.to_string()));
        };
        if !answer.fits(question) {
            return Err(EngineError::ShapeMismatch(question_id.to_string()));
        }
        if self
            .answers
            .get(question_id)
            .is_some_and(|current| current.same_as(&answer))
        {
            return Ok(());
        }

        self.answers.insert(question_id.to_string(), answer);
        *self.revisions.entry(question_id.to_string()).or_insert(0) += 1;

        if self.autosave_enabled {
            let due = now + self.debounce;
            self.pending.insert(question_id.to_string(), due);
            // Failed writes ride along with the next edit.
            for key in self.failed.drain() {
                self.pending.entry(key).or_insert(due);
            }
        }
        Ok(())
    }

    /// Current answer, or the question type's empty value. Never absent.
    pub fn get_answer(&self, question_id: &str) -> Answer {
        if let Some(answer) = self.answers.get(question_id) {
            return answer.clone();
        }
        self.data
            .find(question_id)
            .map(|(_, _, q)| Answer::empty_for(q))
            .unwrap_or_default()
    }

    pub fn answers(&self) -> &HashMap<String, Answer> {
        &self.answers
    }

    pub fn is_question_answered(&self, question: &Question) -> bool {
        self.answers
            .get(&question.key())
            .is_some_and(|a| is_answered(question, a))
    }

    pub fn answered_count(&self) -> usize {
        self.data
            .questions()
            .filter(|q| self.is_question_answered(q))
            .count()
    }

    pub fn fully_answered_count(&self) -> usize {
        self.data
            .questions()
            .filter(|q| {
                self.answers
                    .get(&q.key())
                    .is_some_and(|a| is_fully_answered(q, a))
            })
            .count()
    }

    pub fn answered_in_section(&self, index: usize) -> usize {
        self.data
            .sections
            .get(index)
            .map(|s| {
                s.questions
                    .iter()
                    .filter(|q| self.is_question_answered(q))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Labels of questions that are not fully answered.
    pub fn incomplete_questions(&self) -> Vec<String> {
        self.data
            .questions()
            .filter(|q| {
                !self
                    .answers
                    .get(&q.key())
                    .is_some_and(|a| is_fully_answered(q, a))
            })
            .map(Question::label)
            .collect()
    }

    // ---- cursors ---------------------------------------------------------

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn current_section(&self) -> Option<&NormalizedSection> {
        self.data.sections.get(self.section_index)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_section()
            .and_then(|s| s.questions.get(self.question_index))
    }

    pub fn go_to_section(&mut self, index: usize) {
        self.section_index = index.min(self.data.sections.len().saturating_sub(1));
        self.question_index = 0;
    }

    pub fn go_to_question(&mut self, section_index: usize, question_index: usize) {
        self.section_index = section_index.min(self.data.sections.len().saturating_sub(1));
        let count = self
            .current_section()
            .map(|s| s.questions.len())
            .unwrap_or(0);
        self.question_index = question_index.min(count.saturating_sub(1));
    }

    // ---- clock -----------------------------------------------------------

    pub fn clock(&self) -> &TimerSource {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut TimerSource {
        &mut self.clock
    }

    pub fn time_remaining(&self) -> Option<u64> {
        self.clock.remaining()
    }

    pub fn is_time_up(&self) -> bool {
        self.time_up
    }

    /// Advances the live clock by one second. A local countdown reaching
    /// zero freezes editing; what happens next is up to the caller.
    pub fn tick(&mut self) -> Option<ClockSignal> {
        let signal = self.clock.tick()?;
        if signal.kind == ClockKind::Local && signal.event == ClockEvent::ReachedZero {
            info!("local timer expired, answers are frozen");
            self.time_up = true;
        }
        Some(signal)
    }

    pub fn mark_time_up(&mut self) {
        self.time_up = true;
    }

    // ---- autosave --------------------------------------------------------

    pub fn autosave_status(&self) -> AutoSaveStatus {
        self.autosave_status
    }

    pub fn submission_id(&self) -> Option<i64> {
        self.submission_id
    }

    pub fn set_submission_id(&mut self, id: i64) {
        self.submission_id = Some(id);
    }

    pub fn has_unsaved(&self) -> bool {
        !self.pending.is_empty() || !self.in_flight.is_empty() || !self.failed.is_empty()
    }

    /// Hands out every save whose debounce has elapsed.
    ///
    /// At most one write per question is in flight. Until the backend has
    /// assigned a submission id only a single write goes out, so the draft is
    /// created once.
    pub fn take_due_saves(&mut self, now: Instant) -> Vec<SaveJob> {
        if !self.autosave_enabled || self.submitting || self.submitted {
            return Vec::new();
        }
        let mut due: Vec<String> = self
            .pending
            .iter()
            .filter(|(key, at)| **at <= now && !self.in_flight.contains_key(*key))
            .map(|(key, _)| key.clone())
            .collect();
        due.sort();
        if self.submission_id.is_none() {
            if !self.in_flight.is_empty() {
                return Vec::new();
            }
            due.truncate(1);
        }

        let mut jobs = Vec::with_capacity(due.len());
        for key in due {
            self.pending.remove(&key);
            let revision = self.revisions.get(&key).copied().unwrap_or(0);
            self.in_flight.insert(key.clone(), revision);
            jobs.push(SaveJob {
                submission_id: self.submission_id,
                task_id: self.data.meta.task_id,
                answer: self.get_answer(&key),
                question_id: key,
                revision,
            });
        }
        if !jobs.is_empty() {
            self.autosave_status = AutoSaveStatus::Saving;
        }
        jobs
    }

    pub fn finish_save(&mut self, question_id: &str, revision: u64, result: Result<SaveAck, ApiError>) {
        if self.in_flight.get(question_id) == Some(&revision) {
            self.in_flight.remove(question_id);
        }
        match result {
            Ok(ack) => {
                if self.submission_id.is_none() {
                    info!(submission = ack.submission_id, "draft submission created");
                    self.submission_id = Some(ack.submission_id);
                }
                self.failed.remove(question_id);
                if self.autosave_status != AutoSaveStatus::Error || self.failed.is_empty() {
                    self.autosave_status = if self.pending.is_empty() && self.in_flight.is_empty() {
                        AutoSaveStatus::Saved
                    } else {
                        AutoSaveStatus::Saving
                    };
                }
            }
            Err(e) => {
                warn!(question = question_id, error = %e, "autosave failed");
                self.failed.insert(question_id.to_string());
                self.autosave_status = AutoSaveStatus::Error;
            }
        }
    }

    // ---- submission ------------------------------------------------------

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Assembles the final payload. Confirmation gating lives with the caller;
    /// `forced` is carried through so the backend knows the submit was automatic.
    pub fn begin_submit(&mut self, forced: bool) -> Result<SubmitRequest, EngineError> {
        if self.submitted {
            return Err(EngineError::Submitted);
        }
        if self.submitting {
            return Err(EngineError::AlreadySubmitting);
        }
        self.submitting = true;
        self.pending.clear();
        info!(forced, answers = self.answers.len(), "final submission started");
        Ok(SubmitRequest {
            submission_id: self.submission_id,
            task_id: self.data.meta.task_id,
            mock_ids: self.data.mocks.iter().map(|m| m.id).collect(),
            answers: self
                .answers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            forced,
            practice: self.practice,
        })
    }

    /// Failure keeps every answer so the submit can be retried.
    pub fn finish_submit(&mut self, result: &Result<SubmitOutcome, ApiError>) {
        self.submitting = false;
        match result {
            Ok(outcome) => {
                self.submitted = true;
                self.failed.clear();
                self.in_flight.clear();
                if let SubmitOutcome::Completed { submission } = outcome {
                    self.submission_id.get_or_insert(submission.id);
                }
            }
            Err(e) => warn!(error = %e, "final submission failed"),
        }
    }
}
