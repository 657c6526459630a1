use ieltsroom::error::{ApiError, SyncError};
use ieltsroom::model::{ExamStatus, SectionAdvance, SectionProgress, SectionStatus, SectionType};
use ieltsroom::sync::{SectionOutcome, StatusSynchronizer};

fn status(strict: bool, current: SectionType, sections: &[(SectionType, SectionStatus)]) -> ExamStatus {
    ExamStatus {
        current_section: Some(current),
        section_time_remaining: Some(600),
        total_time_remaining: Some(3600),
        is_strict_mode: strict,
        sections: sections
            .iter()
            .map(|(t, s)| SectionProgress {
                section_type: *t,
                status: *s,
            })
            .collect(),
        allows_section_switching: None,
    }
}

fn strict_sync() -> StatusSynchronizer {
    let mut sync = StatusSynchronizer::new(true);
    sync.bind(9);
    sync.apply_status(status(
        true,
        SectionType::Listening,
        &[
            (SectionType::Listening, SectionStatus::InProgress),
            (SectionType::Reading, SectionStatus::Locked),
        ],
    ));
    sync
}

#[test]
fn test_double_complete_sends_once() {
    let mut sync = strict_sync();
    assert_eq!(
        sync.begin_complete_section(),
        Ok((9, SectionType::Listening))
    );
    assert!(sync.is_action_pending());
    assert_eq!(sync.begin_complete_section(), Err(SyncError::ActionPending));

    let outcome = sync.finish_complete_section(Ok(SectionAdvance {
        success: true,
        next_section: Some(SectionType::Reading),
        section_time_remaining: Some(3600),
    }));
    assert_eq!(
        outcome,
        SectionOutcome::Advanced {
            completed: SectionType::Listening,
            next: SectionType::Reading,
            section_time_remaining: Some(3600),
        }
    );
    // A duplicate response is nobody's business any more.
    let again = sync.finish_complete_section(Ok(SectionAdvance {
        success: true,
        next_section: Some(SectionType::Writing),
        section_time_remaining: None,
    }));
    assert_eq!(again, SectionOutcome::Ignored);

    assert_eq!(sync.current_section(), Some(SectionType::Reading));
    assert_eq!(
        sync.section_status(SectionType::Listening),
        Some(SectionStatus::Completed)
    );
    assert!(!sync.is_section_accessible(SectionType::Listening));
    assert!(sync.is_section_accessible(SectionType::Reading));
}

#[test]
fn test_failed_completion_can_be_retried() {
    let mut sync = strict_sync();
    sync.begin_complete_section().unwrap();
    let outcome = sync.finish_complete_section(Err(ApiError::Transport {
        endpoint: "/submissions/9/complete-section/".to_string(),
        message: "timed out".to_string(),
    }));
    assert_eq!(
        outcome,
        SectionOutcome::Failed {
            message: "Network unavailable".to_string()
        }
    );
    assert!(!sync.is_action_pending());
    assert!(sync.begin_complete_section().is_ok());
}

#[test]
fn test_last_section_completes_exam() {
    let mut sync = strict_sync();
    sync.begin_complete_section().unwrap();
    let outcome = sync.finish_complete_section(Ok(SectionAdvance {
        success: true,
        next_section: None,
        section_time_remaining: None,
    }));
    assert_eq!(
        outcome,
        SectionOutcome::ExamComplete {
            completed: SectionType::Listening
        }
    );
    assert_eq!(sync.current_section(), None);
}

#[test]
fn test_snapshot_ignored_while_action_pending() {
    let mut sync = strict_sync();
    sync.begin_complete_section().unwrap();
    let stale = status(
        true,
        SectionType::Listening,
        &[(SectionType::Listening, SectionStatus::InProgress)],
    );
    assert_eq!(sync.apply_status(stale.clone()), None);

    sync.finish_complete_section(Ok(SectionAdvance {
        success: true,
        next_section: Some(SectionType::Reading),
        section_time_remaining: None,
    }));
    let delta = sync
        .apply_status(status(
            true,
            SectionType::Reading,
            &[
                (SectionType::Listening, SectionStatus::Completed),
                (SectionType::Reading, SectionStatus::InProgress),
            ],
        ))
        .unwrap();
    assert!(!delta.section_changed());
}

#[test]
fn test_strict_mode_refuses_switching() {
    let mut sync = strict_sync();
    assert!(!sync.allows_switching());
    assert_eq!(
        sync.begin_switch_section(SectionType::Reading),
        Err(SyncError::SwitchNotAllowed)
    );
}

#[test]
fn test_relaxed_mode_switches_sections() {
    let mut sync = StatusSynchronizer::new(true);
    sync.bind(9);
    sync.apply_status(status(
        false,
        SectionType::Listening,
        &[
            (SectionType::Listening, SectionStatus::InProgress),
            (SectionType::Reading, SectionStatus::Available),
            (SectionType::Writing, SectionStatus::Locked),
        ],
    ));
    assert!(sync.is_section_accessible(SectionType::Reading));
    assert!(!sync.is_section_accessible(SectionType::Writing));
    assert_eq!(
        sync.begin_switch_section(SectionType::Writing),
        Err(SyncError::SectionInaccessible(SectionType::Writing))
    );

    assert_eq!(
        sync.begin_switch_section(SectionType::Reading),
        Ok((9, SectionType::Reading))
    );
    let outcome = sync.finish_switch_section(Ok(status(
        false,
        SectionType::Reading,
        &[
            (SectionType::Listening, SectionStatus::Available),
            (SectionType::Reading, SectionStatus::InProgress),
        ],
    )));
    assert_eq!(
        outcome,
        SectionOutcome::Switched {
            to: SectionType::Reading
        }
    );
    assert_eq!(sync.current_section(), Some(SectionType::Reading));
}

#[test]
fn test_disabled_synchronizer_is_inert() {
    let mut sync = StatusSynchronizer::new(false);
    assert!(sync.apply_status(status(true, SectionType::Reading, &[])).is_none());
    assert!(sync.is_section_accessible(SectionType::Writing));
    assert_eq!(sync.begin_complete_section(), Err(SyncError::NoSession));
}
