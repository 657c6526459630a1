mod common;

use std::collections::BTreeMap;
use std::fs;

use chrono::{TimeZone, Utc};

use ieltsroom::answer::Answer;
use ieltsroom::error::PersistError;
use ieltsroom::persist::{export_answers, status_report, task_key, DraftCache};

fn answers() -> BTreeMap<String, Answer> {
    let mut answers = BTreeMap::new();
    answers.insert(
        "101".to_string(),
        Answer::Single {
            value: "B".to_string(),
        },
    );
    answers.insert(
        "201".to_string(),
        Answer::Keyed {
            values: [("5".to_string(), "cat".to_string())].into_iter().collect(),
        },
    );
    answers
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ieltsroom_test_{}", name));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_draft_round_trip_and_clear() {
    let dir = scratch_dir("draft_round_trip");
    let data = common::task_data();
    let cache = DraftCache::new(&dir, &data);
    assert!(cache.load().unwrap().is_none());

    let saved_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 15, 0).unwrap();
    cache.save(Some(9), &answers(), saved_at).unwrap();
    assert!(cache.path().starts_with(&dir));
    assert_eq!(cache.path().extension().unwrap(), "yaml");

    let draft = cache.load().unwrap().unwrap();
    assert_eq!(draft.answers, answers());
    assert_eq!(draft.session.submission_id, Some(9));
    assert_eq!(draft.session.task_id, Some(42));
    assert_eq!(draft.session.saved_at, saved_at);

    cache.clear().unwrap();
    assert!(cache.load().unwrap().is_none());
    // Clearing twice is fine.
    cache.clear().unwrap();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_corrupt_draft_is_reported() {
    let dir = scratch_dir("draft_corrupt");
    let data = common::task_data();
    let cache = DraftCache::new(&dir, &data);
    fs::create_dir_all(&dir).unwrap();
    fs::write(cache.path(), "answers: [not, a, map").unwrap();

    match cache.load() {
        Err(PersistError::Corrupt { message, .. }) => assert!(!message.is_empty()),
        other => panic!("Expected Corrupt, got {:?}", other.map(|_| ())),
    }
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_task_key_distinguishes_sources() {
    let task = common::task_data();
    let mock = common::mock_data();
    assert!(task_key(&task).starts_with("sha256:"));
    assert_ne!(task_key(&task), task_key(&mock));
    assert_eq!(task_key(&task), task_key(&common::task_data()));
}

#[test]
fn test_export_writes_yaml() {
    let dir = scratch_dir("draft_export");
    let data = common::task_data();
    let cache = DraftCache::new(&dir, &data);
    cache.save(None, &answers(), Utc::now()).unwrap();
    let draft = cache.load().unwrap().unwrap();

    let out = dir.join("backup.yaml");
    export_answers(&draft, &out).unwrap();
    let content = fs::read_to_string(&out).unwrap();
    assert!(content.contains("task_key"));
    assert!(content.contains("cat"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_status_report_counts_per_section() {
    let data = common::task_data();
    let report = status_report(&data, &answers());
    assert_eq!(report.total, 4);
    assert_eq!(report.answered, 1);
    assert_eq!(report.fully_answered, 1);
    assert_eq!(report.sections[0].answered, 1);
    assert_eq!(report.sections[0].total, 3);
    assert_eq!(report.sections[1].answered, 0);
}
