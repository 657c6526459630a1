//! Server-authoritative section state for official exams.
//!
//! The synchronizer caches the latest [`ExamStatus`] and owns the single
//! "action pending" flag that keeps section completion and switching from
//! being sent twice.

use tracing::{debug, info, warn};

use crate::error::{ApiError, SyncError};
use crate::model::{ExamStatus, SectionAdvance, SectionStatus, SectionType};
use crate::normalize::ExamMeta;

/// Official exams are driven by the server; practice and template sessions keep a local clock.
pub fn use_status_hook(meta: &ExamMeta, practice: bool) -> bool {
    !practice && !meta.template_practice && meta.task_id.is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    Complete(SectionType),
    Switch(SectionType),
}

/// What a status snapshot changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDelta {
    pub previous: Option<SectionType>,
    pub current: Option<SectionType>,
    pub section_time_remaining: Option<u64>,
}

impl StatusDelta {
    pub fn section_changed(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Advanced {
        completed: SectionType,
        next: SectionType,
        section_time_remaining: Option<u64>,
    },
    /// `success` with no next section: the caller must submit.
    ExamComplete { completed: SectionType },
    Switched { to: SectionType },
    Failed { message: String },
    /// A response nobody was waiting for (stale or after teardown).
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct StatusSynchronizer {
    enabled: bool,
    submission_id: Option<i64>,
    status: Option<ExamStatus>,
    pending: Option<PendingAction>,
}

impl StatusSynchronizer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bind(&mut self, submission_id: i64) {
        if self.submission_id != Some(submission_id) {
            debug!(submission = submission_id, "status synchronizer bound");
            self.submission_id = Some(submission_id);
        }
    }

    pub fn submission_id(&self) -> Option<i64> {
        self.submission_id
    }

    pub fn status(&self) -> Option<&ExamStatus> {
        self.status.as_ref()
    }

    pub fn current_section(&self) -> Option<SectionType> {
        self.status.as_ref().and_then(|s| s.current_section)
    }

    pub fn is_strict(&self) -> bool {
        self.enabled && self.status.as_ref().map_or(true, |s| s.is_strict_mode)
    }

    pub fn allows_switching(&self) -> bool {
        self.status.as_ref().is_some_and(ExamStatus::allows_switching)
    }

    pub fn is_action_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn section_status(&self, section: SectionType) -> Option<SectionStatus> {
        self.status.as_ref().and_then(|s| s.status_of(section))
    }

    /// Strict mode only lets the learner into the section in progress.
    pub fn is_section_accessible(&self, section: SectionType) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(status) = &self.status else {
            return false;
        };
        match status.status_of(section) {
            Some(SectionStatus::InProgress) => true,
            Some(SectionStatus::Available) => !status.is_strict_mode,
            Some(SectionStatus::Locked) | Some(SectionStatus::Completed) => false,
            None => !status.is_strict_mode,
        }
    }

    /// Stores a polled snapshot. Ignored while a section action is in flight,
    /// since the snapshot may predate it.
    pub fn apply_status(&mut self, status: ExamStatus) -> Option<StatusDelta> {
        if !self.enabled {
            return None;
        }
        if self.pending.is_some() {
            debug!("status snapshot ignored, section action pending");
            return None;
        }
        let delta = StatusDelta {
            previous: self.current_section(),
            current: status.current_section,
            section_time_remaining: status.section_time_remaining,
        };
        if delta.section_changed() {
            info!(from = ?delta.previous, to = ?delta.current, "server moved current section");
        }
        self.status = Some(status);
        Some(delta)
    }

    pub fn begin_complete_section(&mut self) -> Result<(i64, SectionType), SyncError> {
        let submission_id = self.submission_id.ok_or(SyncError::NoSession)?;
        if self.pending.is_some() {
            return Err(SyncError::ActionPending);
        }
        let section = self
            .current_section()
            .ok_or(SyncError::NoSession)?;
        if self.section_status(section) == Some(SectionStatus::Completed) {
            return Err(SyncError::SectionInaccessible(section));
        }
        info!(?section, "completing section");
        self.pending = Some(PendingAction::Complete(section));
        Ok((submission_id, section))
    }

    pub fn finish_complete_section(
        &mut self,
        result: Result<SectionAdvance, ApiError>,
    ) -> SectionOutcome {
        let Some(PendingAction::Complete(completed)) = self.pending else {
            return SectionOutcome::Ignored;
        };
        self.pending = None;
        let advance = match result {
            Ok(advance) if advance.success => advance,
            Ok(_) => {
                return SectionOutcome::Failed {
                    message: "The server did not accept the section completion".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, ?completed, "complete-section failed");
                return SectionOutcome::Failed {
                    message: e.user_message(),
                };
            }
        };

        let status = self.status.get_or_insert_with(|| ExamStatus {
            current_section: Some(completed),
            section_time_remaining: None,
            total_time_remaining: None,
            is_strict_mode: true,
            sections: Vec::new(),
            allows_section_switching: Some(false),
        });
        status.set_status(completed, SectionStatus::Completed);
        match advance.next_section {
            Some(next) => {
                status.set_status(next, SectionStatus::InProgress);
                status.current_section = Some(next);
                status.section_time_remaining = advance.section_time_remaining;
                SectionOutcome::Advanced {
                    completed,
                    next,
                    section_time_remaining: advance.section_time_remaining,
                }
            }
            None => {
                info!("last section completed");
                status.current_section = None;
                status.section_time_remaining = Some(0);
                SectionOutcome::ExamComplete { completed }
            }
        }
    }

    pub fn begin_switch_section(&mut self, target: SectionType) -> Result<(i64, SectionType), SyncError> {
        let submission_id = self.submission_id.ok_or(SyncError::NoSession)?;
        if self.pending.is_some() {
            return Err(SyncError::ActionPending);
        }
        if !self.allows_switching() {
            return Err(SyncError::SwitchNotAllowed);
        }
        if matches!(
            self.section_status(target),
            Some(SectionStatus::Locked) | Some(SectionStatus::Completed)
        ) {
            return Err(SyncError::SectionInaccessible(target));
        }
        self.pending = Some(PendingAction::Switch(target));
        Ok((submission_id, target))
    }

    pub fn finish_switch_section(&mut self, result: Result<ExamStatus, ApiError>) -> SectionOutcome {
        let Some(PendingAction::Switch(target)) = self.pending else {
            return SectionOutcome::Ignored;
        };
        self.pending = None;
        match result {
            Ok(status) => {
                let to = status.current_section.unwrap_or(target);
                self.status = Some(status);
                SectionOutcome::Switched { to }
            }
            Err(e) => {
                warn!(error = %e, ?target, "switch-section failed");
                SectionOutcome::Failed {
                    message: e.user_message(),
                }
            }
        }
    }
}
