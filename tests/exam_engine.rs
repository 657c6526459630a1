mod common;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use ieltsroom::answer::Answer;
use ieltsroom::engine::{AutoSaveStatus, EngineOptions, ExamEngine};
use ieltsroom::error::{ApiError, EngineError};
use ieltsroom::model::{SaveAck, Submission, SubmissionStatus, SubmitOutcome};
use ieltsroom::timer::TimerSource;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn engine() -> ExamEngine {
    ExamEngine::new(
        common::task_data(),
        EngineOptions {
            clock: TimerSource::Untimed,
            autosave_debounce: DEBOUNCE,
            autosave: true,
            practice: false,
        },
    )
}

fn single(v: &str) -> Answer {
    Answer::Single {
        value: v.to_string(),
    }
}

fn keyed(pairs: &[(&str, &str)]) -> Answer {
    Answer::Keyed {
        values: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn network_down() -> ApiError {
    ApiError::Transport {
        endpoint: "/submissions/1/answers/".to_string(),
        message: "connection refused".to_string(),
    }
}

#[test]
fn test_answered_count_with_grouped_question() {
    let t0 = Instant::now();
    let mut engine = engine();
    assert_eq!(engine.answered_count(), 0);

    engine.update_answer("101", single("A"), t0).unwrap();
    engine.update_answer("201", keyed(&[("5", "cat")]), t0).unwrap();
    assert_eq!(engine.answered_count(), 1);

    engine
        .update_answer(
            "201",
            keyed(&[("4", "Tuesday"), ("5", "cat"), ("6", "garden")]),
            t0,
        )
        .unwrap();
    assert_eq!(engine.answered_count(), 2);
    assert_eq!(engine.answered_in_section(1), 1);
    assert!(engine.answered_count() <= engine.data().total_questions);

    engine.update_answer("101", single(""), t0).unwrap();
    assert_eq!(engine.answered_count(), 1);
}

#[test]
fn test_get_answer_is_never_absent() {
    let engine = engine();
    assert_eq!(engine.get_answer("101"), single(""));
    assert_eq!(
        engine.get_answer("201"),
        Answer::Keyed {
            values: BTreeMap::new()
        }
    );
}

#[test]
fn test_rejects_unknown_and_misshaped_answers() {
    let t0 = Instant::now();
    let mut engine = engine();
    assert_eq!(
        engine.update_answer("999", single("A"), t0),
        Err(EngineError::UnknownQuestion("999".to_string()))
    );
    assert_eq!(
        engine.update_answer("201", single("A"), t0),
        Err(EngineError::ShapeMismatch("201".to_string()))
    );
}

#[test]
fn test_saves_are_debounced() {
    let t0 = Instant::now();
    let mut engine = engine();
    engine.set_submission_id(9);
    engine.update_answer("101", single("A"), t0).unwrap();
    assert!(engine.take_due_saves(t0 + Duration::from_millis(100)).is_empty());

    let jobs = engine.take_due_saves(t0 + DEBOUNCE);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].question_id, "101");
    assert_eq!(jobs[0].submission_id, Some(9));
    assert_eq!(jobs[0].answer, single("A"));
    assert_eq!(engine.autosave_status(), AutoSaveStatus::Saving);

    engine.finish_save("101", jobs[0].revision, Ok(SaveAck { submission_id: 9 }));
    assert_eq!(engine.autosave_status(), AutoSaveStatus::Saved);
    assert!(!engine.has_unsaved());
}

#[test]
fn test_identical_answer_is_not_resaved() {
    let t0 = Instant::now();
    let mut engine = engine();
    engine.set_submission_id(9);
    engine.update_answer("101", single("A"), t0).unwrap();
    let jobs = engine.take_due_saves(t0 + DEBOUNCE);
    engine.finish_save("101", jobs[0].revision, Ok(SaveAck { submission_id: 9 }));

    engine.update_answer("101", single("A"), t0 + DEBOUNCE).unwrap();
    assert!(engine.take_due_saves(t0 + DEBOUNCE * 4).is_empty());
}

#[test]
fn test_first_write_creates_draft_once() {
    let t0 = Instant::now();
    let due = t0 + DEBOUNCE;
    let mut engine = engine();
    engine.update_answer("101", single("A"), t0).unwrap();
    engine.update_answer("102", single("B"), t0).unwrap();

    let first = engine.take_due_saves(due);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].submission_id, None);
    assert_eq!(first[0].task_id, Some(42));
    assert!(engine.take_due_saves(due).is_empty());

    engine.finish_save(
        &first[0].question_id,
        first[0].revision,
        Ok(SaveAck { submission_id: 77 }),
    );
    assert_eq!(engine.submission_id(), Some(77));

    let rest = engine.take_due_saves(due);
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].submission_id, Some(77));
}

#[test]
fn test_failed_save_rides_with_next_edit() {
    let t0 = Instant::now();
    let mut engine = engine();
    engine.set_submission_id(1);
    engine.update_answer("101", single("A"), t0).unwrap();
    let jobs = engine.take_due_saves(t0 + DEBOUNCE);
    engine.finish_save("101", jobs[0].revision, Err(network_down()));
    assert_eq!(engine.autosave_status(), AutoSaveStatus::Error);
    assert!(engine.has_unsaved());

    // No background retry.
    assert!(engine.take_due_saves(t0 + DEBOUNCE * 10).is_empty());

    let t1 = t0 + DEBOUNCE * 10;
    engine.update_answer("102", single("C"), t1).unwrap();
    let mut retried: Vec<String> = engine
        .take_due_saves(t1 + DEBOUNCE)
        .into_iter()
        .map(|j| j.question_id)
        .collect();
    retried.sort();
    assert_eq!(retried, vec!["101", "102"]);
}

#[test]
fn test_stale_save_result_keeps_newer_write_in_flight() {
    let t0 = Instant::now();
    let mut engine = engine();
    engine.set_submission_id(1);
    engine.update_answer("101", single("A"), t0).unwrap();
    let old = engine.take_due_saves(t0 + DEBOUNCE);

    engine.update_answer("101", single("B"), t0 + DEBOUNCE).unwrap();
    // The older write is still in flight.
    assert!(engine.take_due_saves(t0 + DEBOUNCE * 2).is_empty());

    engine.finish_save("101", old[0].revision, Ok(SaveAck { submission_id: 1 }));
    let newer = engine.take_due_saves(t0 + DEBOUNCE * 2);
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].answer, single("B"));
    assert!(newer[0].revision > old[0].revision);
}

#[test]
fn test_submit_failure_keeps_answers() {
    let t0 = Instant::now();
    let mut engine = engine();
    engine.update_answer("101", single("A"), t0).unwrap();

    let request = engine.begin_submit(false).unwrap();
    assert_eq!(request.answers.get("101"), Some(&single("A")));
    assert_eq!(request.mock_ids, vec![7, 8]);
    assert!(engine.is_submitting());
    assert_eq!(engine.begin_submit(false), Err(EngineError::AlreadySubmitting));

    engine.finish_submit(&Err(network_down()));
    assert!(!engine.is_submitting());
    assert!(!engine.is_submitted());
    assert_eq!(engine.get_answer("101"), single("A"));

    let retry = engine.begin_submit(true).unwrap();
    assert!(retry.forced);
    let submission = Submission {
        id: 5,
        status: SubmissionStatus::Submitted,
        answers: retry.answers.clone(),
        current_section: None,
        section_time_remaining: None,
        total_time_remaining: None,
    };
    engine.finish_submit(&Ok(SubmitOutcome::Completed { submission }));
    assert!(engine.is_submitted());
    assert_eq!(engine.submission_id(), Some(5));
    assert_eq!(
        engine.update_answer("101", single("B"), t0),
        Err(EngineError::Submitted)
    );
}

#[test]
fn test_local_countdown_freezes_answers() {
    let t0 = Instant::now();
    let mut engine = ExamEngine::new(
        common::task_data(),
        EngineOptions {
            clock: TimerSource::local(2),
            autosave_debounce: DEBOUNCE,
            autosave: false,
            practice: true,
        },
    );
    assert!(engine.tick().is_none());
    assert!(engine.tick().is_some());
    assert!(engine.is_time_up());
    assert_eq!(engine.time_remaining(), Some(0));
    assert_eq!(
        engine.update_answer("101", single("A"), t0),
        Err(EngineError::TimeUp)
    );
}

#[test]
fn test_seed_draft_keeps_local_answers() {
    let t0 = Instant::now();
    let mut engine = engine();
    let mut local = BTreeMap::new();
    local.insert("101".to_string(), single("D"));
    assert_eq!(engine.restore_local(&local, t0), 1);

    let mut server = BTreeMap::new();
    server.insert("101".to_string(), single("A"));
    server.insert("102".to_string(), single("B"));
    server.insert("555".to_string(), single("B"));
    let adopted = engine.seed_draft(&Submission {
        id: 3,
        status: SubmissionStatus::InProgress,
        answers: server,
        current_section: None,
        section_time_remaining: None,
        total_time_remaining: None,
    });
    assert_eq!(adopted, vec!["102"]);
    assert_eq!(engine.get_answer("101"), single("D"));
    assert_eq!(engine.submission_id(), Some(3));

    // Restored answers are resent.
    let jobs = engine.take_due_saves(t0 + DEBOUNCE);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].question_id, "101");
}
