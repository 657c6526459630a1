//! Flattens tasks and standalone mocks into one section/question model.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::NormalizeError;
use crate::model::{Mock, MockRef, Question, SectionType, Task, TaskType};

/// What a session is started from.
#[derive(Debug, Clone)]
pub enum ExamSource {
    /// An assigned task whose mock references are already resolved.
    Task(Task),
    /// A single mock taken as a self-check template.
    Mock(Mock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamMeta {
    pub task_id: Option<i64>,
    pub title: String,
    pub task_type: Option<TaskType>,
    pub deadline: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub allow_audio_pause: bool,
    pub max_attempts: Option<u32>,
    pub template_practice: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockSummary {
    pub id: i64,
    pub title: String,
    pub mock_type: Option<SectionType>,
    pub audio_file: Option<String>,
    pub audio_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSection {
    pub id: i64,
    pub title: String,
    pub mock_id: i64,
    pub section_type: Option<SectionType>,
    pub instructions: String,
    pub text: String,
    pub images: Vec<String>,
    pub questions: Vec<Question>,
    pub audio_file: Option<String>,
    pub audio_duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedData {
    pub meta: ExamMeta,
    pub sections: Vec<NormalizedSection>,
    pub total_questions: usize,
    pub mocks: Vec<MockSummary>,
}

impl NormalizedData {
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    /// Locates a question by its answer key: (section index, question index, question).
    pub fn find(&self, key: &str) -> Option<(usize, usize, &Question)> {
        self.sections.iter().enumerate().find_map(|(si, s)| {
            s.questions
                .iter()
                .enumerate()
                .find(|(_, q)| q.key() == key)
                .map(|(qi, q)| (si, qi, q))
        })
    }

    pub fn first_section_of(&self, section_type: SectionType) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.section_type == Some(section_type))
    }

    pub fn section_types(&self) -> Vec<SectionType> {
        let mut seen = Vec::new();
        for t in self.sections.iter().filter_map(|s| s.section_type) {
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
        seen
    }

    pub fn duration_secs(&self) -> Option<u64> {
        self.meta.duration_minutes.map(|m| u64::from(m) * 60)
    }
}

pub fn normalize(source: &ExamSource) -> Result<NormalizedData, NormalizeError> {
    let (meta, mocks): (ExamMeta, Vec<&Mock>) = match source {
        ExamSource::Task(task) => {
            let refs: &[MockRef] = match &task.mocks {
                Some(refs) => refs.as_slice(),
                None if task.task_type.requires_mocks() => {
                    return Err(NormalizeError::MissingMocks {
                        task_type: task.task_type,
                    });
                }
                None => &[],
            };
            let mut mocks = Vec::with_capacity(refs.len());
            for r in refs {
                match r {
                    MockRef::Inline(mock) => mocks.push(mock.as_ref()),
                    MockRef::Id(id) => return Err(NormalizeError::UnresolvedMock { id: *id }),
                }
            }
            let meta = ExamMeta {
                task_id: Some(task.id),
                title: task.title.clone(),
                task_type: Some(task.task_type),
                deadline: task.deadline,
                duration_minutes: task.duration_minutes,
                allow_audio_pause: task.allow_audio_pause,
                max_attempts: task.max_attempts,
                template_practice: false,
            };
            (meta, mocks)
        }
        ExamSource::Mock(mock) => {
            let meta = ExamMeta {
                task_id: None,
                title: mock.title.clone(),
                task_type: None,
                deadline: None,
                duration_minutes: None,
                allow_audio_pause: true,
                max_attempts: None,
                template_practice: true,
            };
            (meta, vec![mock])
        }
    };

    let mut sections = Vec::new();
    let mut summaries = Vec::with_capacity(mocks.len());
    for mock in mocks {
        summaries.push(MockSummary {
            id: mock.id,
            title: mock.title.clone(),
            mock_type: mock.mock_type.or_else(|| SectionType::infer(&mock.title)),
            audio_file: mock.audio_file.clone(),
            audio_duration: mock.audio_duration,
        });
        for part in &mock.sections {
            let section_type = SectionType::infer(&part.title)
                .or(mock.mock_type)
                .or_else(|| SectionType::infer(&mock.title));
            sections.push(NormalizedSection {
                id: part.id,
                title: part.title.clone(),
                mock_id: mock.id,
                section_type,
                instructions: part.instructions.clone().unwrap_or_default(),
                text: part.text.clone().unwrap_or_default(),
                images: part.images.clone(),
                questions: part.questions.iter().map(repair_range).collect(),
                audio_file: part.audio_file.clone().or_else(|| mock.audio_file.clone()),
                audio_duration: mock.audio_duration,
            });
        }
    }

    let total_questions = sections.iter().map(|s| s.questions.len()).sum();
    debug!(
        sections = sections.len(),
        total_questions, "normalized exam payload"
    );

    Ok(NormalizedData {
        meta,
        sections,
        total_questions,
        mocks: summaries,
    })
}

/// Accepts the raw page payload: a task, a bare mock, or nothing at all.
pub fn normalize_json(raw: &Value) -> Result<NormalizedData, NormalizeError> {
    if raw.is_null() {
        return Err(NormalizeError::MissingTask);
    }
    if raw.get("task_type").is_some() {
        let task: Task = serde_json::from_value(raw.clone())
            .map_err(|e| NormalizeError::Malformed(e.to_string()))?;
        return normalize(&ExamSource::Task(task));
    }
    if raw.get("sections").is_some() || raw.get("mock_type").is_some() {
        let mock: Mock = serde_json::from_value(raw.clone())
            .map_err(|e| NormalizeError::Malformed(e.to_string()))?;
        return normalize(&ExamSource::Mock(mock));
    }
    Err(NormalizeError::Malformed(
        "neither a task nor a mock".to_string(),
    ))
}

fn repair_range(question: &Question) -> Question {
    let mut q = question.clone();
    if let (Some(start), Some(end)) = (q.question_number_start, q.question_number_end) {
        if end < start {
            warn!(question = q.id, start, end, "inverted question range, collapsing");
            q.question_number_end = Some(start);
        }
    }
    q
}
