#![allow(dead_code)]

use std::fs;

use serde_json::Value;

use ieltsroom::model::{Mock, Task};
use ieltsroom::normalize::{normalize, ExamSource, NormalizedData};

pub fn task_json() -> Value {
    let content = fs::read_to_string("fixtures/ielts_task.json").expect("Cannot read fixture");
    serde_json::from_str(&content).unwrap()
}

pub fn task() -> Task {
    serde_json::from_value(task_json()).unwrap()
}

pub fn task_with(edit: impl FnOnce(&mut Value)) -> Task {
    let mut raw = task_json();
    edit(&mut raw);
    serde_json::from_value(raw).unwrap()
}

pub fn task_data() -> NormalizedData {
    normalize(&ExamSource::Task(task())).unwrap()
}

pub fn mock() -> Mock {
    let content = fs::read_to_string("fixtures/writing_mock.json").expect("Cannot read fixture");
    serde_json::from_str(&content).unwrap()
}

pub fn mock_data() -> NormalizedData {
    normalize(&ExamSource::Mock(mock())).unwrap()
}
