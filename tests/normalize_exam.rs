mod common;

use serde_json::json;

use ieltsroom::error::NormalizeError;
use ieltsroom::model::{SectionType, TaskType};
use ieltsroom::normalize::{normalize, normalize_json, ExamSource};

#[test]
fn test_task_is_flattened_in_order() {
    let data = common::task_data();

    assert_eq!(data.meta.task_id, Some(42));
    assert_eq!(data.meta.title, "IELTS Academic Mock 3");
    assert_eq!(data.meta.task_type, Some(TaskType::ExamMock));
    assert!(!data.meta.template_practice);
    assert_eq!(data.sections.len(), 2);
    assert_eq!(data.sections[0].section_type, Some(SectionType::Reading));
    assert_eq!(data.sections[1].section_type, Some(SectionType::Listening));
    assert_eq!(data.sections[0].mock_id, 7);
    assert_eq!(data.mocks.iter().map(|m| m.id).collect::<Vec<_>>(), vec![7, 8]);
}

#[test]
fn test_grouped_question_counts_once() {
    let data = common::task_data();
    assert_eq!(data.total_questions, 4);
    assert_eq!(data.questions().count(), 4);

    let (si, qi, grouped) = data.find("201").unwrap();
    assert_eq!((si, qi), (1, 0));
    assert!(grouped.is_grouped());
    assert_eq!(grouped.sub_keys(), vec!["4", "5", "6"]);
    assert_eq!(grouped.label(), "Q4–6");
}

#[test]
fn test_section_inherits_mock_audio() {
    let data = common::task_data();
    let listening = &data.sections[1];
    assert_eq!(listening.audio_file.as_deref(), Some("listening/mock8.mp3"));
    assert_eq!(listening.audio_duration, Some(30));
    assert_eq!(data.sections[0].audio_file, None);
    assert_eq!(listening.text, "");
}

#[test]
fn test_normalize_is_pure() {
    let source = ExamSource::Task(common::task());
    let first = normalize(&source).unwrap();
    let second = normalize(&source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_mocks_rejected_for_mock_tasks() {
    let task = common::task_with(|raw| {
        raw.as_object_mut().unwrap().remove("mocks");
    });
    let err = normalize(&ExamSource::Task(task)).unwrap_err();
    assert_eq!(
        err,
        NormalizeError::MissingMocks {
            task_type: TaskType::ExamMock
        }
    );
}

#[test]
fn test_quiz_without_mocks_is_empty() {
    let task = common::task_with(|raw| {
        raw["task_type"] = json!("QUIZ");
        raw["mocks"] = json!(null);
    });
    let data = normalize(&ExamSource::Task(task)).unwrap();
    assert!(data.sections.is_empty());
    assert_eq!(data.total_questions, 0);
}

#[test]
fn test_unresolved_mock_reference() {
    let task = common::task_with(|raw| {
        raw["mocks"] = json!([7, 8]);
    });
    let err = normalize(&ExamSource::Task(task)).unwrap_err();
    assert_eq!(err, NormalizeError::UnresolvedMock { id: 7 });
}

#[test]
fn test_inverted_range_collapses() {
    let task = common::task_with(|raw| {
        let q = &mut raw["mocks"][1]["sections"][0]["questions"][0];
        q["question_number_start"] = json!(6);
        q["question_number_end"] = json!(4);
    });
    let data = normalize(&ExamSource::Task(task)).unwrap();
    let (_, _, q) = data.find("201").unwrap();
    assert!(!q.is_grouped());
    assert_eq!(q.label(), "Q6");
}

#[test]
fn test_bare_mock_is_template_practice() {
    let data = common::mock_data();
    assert!(data.meta.template_practice);
    assert_eq!(data.meta.task_id, None);
    assert_eq!(data.total_questions, 6);
    // Section title wins over the mock type.
    assert_eq!(data.sections[1].section_type, Some(SectionType::Writing));
    assert_eq!(data.sections[0].section_type, Some(SectionType::Reading));
}

#[test]
fn test_normalize_json_detects_payload_kind() {
    let from_task = normalize_json(&common::task_json()).unwrap();
    assert_eq!(from_task.meta.task_id, Some(42));

    let raw_mock = serde_json::to_value(common::mock()).unwrap();
    let from_mock = normalize_json(&raw_mock).unwrap();
    assert!(from_mock.meta.template_practice);

    assert_eq!(
        normalize_json(&serde_json::Value::Null).unwrap_err(),
        NormalizeError::MissingTask
    );
    assert!(matches!(
        normalize_json(&json!({ "title": "nothing" })),
        Err(NormalizeError::Malformed(_))
    ));
}
