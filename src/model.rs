use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answer::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    ExamMock,
    PracticeMock,
    CustomMock,
    Quiz,
}

impl TaskType {
    /// Quizzes may carry no mocks at all; every mock-based task needs at least one.
    pub fn requires_mocks(self) -> bool {
        !matches!(self, TaskType::Quiz)
    }

    pub fn is_official(self) -> bool {
        matches!(self, TaskType::ExamMock)
    }
}

/// Skill component of a mock. Doubles as the section type the server tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    Listening,
    Reading,
    Writing,
}

pub type MockType = SectionType;

impl SectionType {
    pub const ALL: [SectionType; 3] = [
        SectionType::Listening,
        SectionType::Reading,
        SectionType::Writing,
    ];

    /// Case-insensitive match against a free-form title ("Listening Part 1").
    pub fn infer(title: &str) -> Option<Self> {
        let upper = title.to_uppercase();
        SectionType::ALL
            .into_iter()
            .find(|t| upper.contains(t.as_str()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Listening => "LISTENING",
            SectionType::Reading => "READING",
            SectionType::Writing => "WRITING",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionType::Listening => "Listening",
            SectionType::Reading => "Reading",
            SectionType::Writing => "Writing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mocks: Option<Vec<MockRef>>,
    #[serde(default)]
    pub allow_audio_pause: bool,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// `GET /tasks/{id}/` lists mock ids; the client swaps them for full mocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockRef {
    Id(i64),
    Inline(Box<Mock>),
}

impl MockRef {
    pub fn id(&self) -> i64 {
        match self {
            MockRef::Id(id) => *id,
            MockRef::Inline(mock) => mock.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mock {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mock_type: Option<MockType>,
    #[serde(default)]
    pub audio_file: Option<String>,
    /// Seconds; used to end playback when known.
    #[serde(default)]
    pub audio_duration: Option<u32>,
    #[serde(default)]
    pub sections: Vec<MockSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSection {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    McqSingle,
    McqMultiple,
    Tfng,
    ShortAnswer,
    SummaryFillBlanks,
    SummaryDragDrop,
    MatchingDragDrop,
    MatchingTableClick,
    TableCompletion,
    FlowchartCompletion,
    MapLabelling,
    Essay,
}

impl QuestionType {
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::McqSingle => "Multiple choice",
            QuestionType::McqMultiple => "Multiple choice (several)",
            QuestionType::Tfng => "True / False / Not Given",
            QuestionType::ShortAnswer => "Short answer",
            QuestionType::SummaryFillBlanks => "Summary completion",
            QuestionType::SummaryDragDrop => "Summary (word bank)",
            QuestionType::MatchingDragDrop => "Matching",
            QuestionType::MatchingTableClick => "Matching table",
            QuestionType::TableCompletion => "Table completion",
            QuestionType::FlowchartCompletion => "Flow-chart completion",
            QuestionType::MapLabelling => "Map labelling",
            QuestionType::Essay => "Essay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub key: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blank {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    #[serde(default)]
    pub question_number: Option<u32>,
    #[serde(default)]
    pub question_number_start: Option<u32>,
    #[serde(default)]
    pub question_number_end: Option<u32>,
    pub question_type: QuestionType,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub correct_answer: Option<Value>,
}

impl Question {
    /// Answers are keyed by the stringified question id.
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn number_start(&self) -> u32 {
        self.question_number_start
            .or(self.question_number)
            .unwrap_or(0)
    }

    pub fn number_end(&self) -> u32 {
        let start = self.number_start();
        self.question_number_end.unwrap_or(start).max(start)
    }

    pub fn number_range(&self) -> RangeInclusive<u32> {
        self.number_start()..=self.number_end()
    }

    pub fn is_grouped(&self) -> bool {
        self.number_end() > self.number_start()
    }

    pub fn label(&self) -> String {
        if self.is_grouped() {
            format!("Q{}–{}", self.number_start(), self.number_end())
        } else {
            format!("Q{}", self.number_start())
        }
    }

    /// Sub-question numbers of a grouped question, as answer keys.
    pub fn sub_keys(&self) -> Vec<String> {
        self.number_range().map(|n| n.to_string()).collect()
    }

    pub fn options(&self) -> Vec<ChoiceOption> {
        let parsed = parse_options(self.content.get("options"));
        if parsed.is_empty() && self.question_type == QuestionType::Tfng {
            return ["TRUE", "FALSE", "NOT GIVEN"]
                .iter()
                .map(|k| ChoiceOption {
                    key: k.to_string(),
                    text: String::new(),
                })
                .collect();
        }
        parsed
    }

    /// Fill-in slots. Falls back to the sub-question numbers for grouped questions.
    pub fn blanks(&self) -> Vec<Blank> {
        let parsed: Vec<Blank> = self
            .content
            .get("blanks")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        if !parsed.is_empty() {
            return parsed;
        }
        self.number_range()
            .map(|n| Blank {
                id: n.to_string(),
                label: n.to_string(),
            })
            .collect()
    }

    pub fn regions(&self) -> Vec<Blank> {
        let parsed: Vec<Blank> = self
            .content
            .get("regions")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        if parsed.is_empty() {
            return self.blanks();
        }
        parsed
    }

    pub fn rows(&self) -> Vec<MatchRow> {
        self.content
            .get("rows")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Word bank for drag-and-drop summaries and map labels.
    pub fn word_bank(&self) -> Vec<ChoiceOption> {
        let bank = parse_options(self.content.get("word_bank"));
        if bank.is_empty() {
            return parse_options(self.content.get("labels"));
        }
        bank
    }

    /// How many choices a multi-select expects ("Choose TWO letters").
    pub fn select_count(&self) -> usize {
        self.content
            .get("select_count")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or_else(|| (self.number_end() - self.number_start() + 1) as usize)
            .max(1)
    }

    pub fn min_words(&self) -> Option<usize> {
        self.content
            .get("min_words")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
    }
}

/// Options come either as `[{key, text}]` or as bare strings lettered A, B, C...
fn parse_options(value: Option<&Value>) -> Vec<ChoiceOption> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::String(text) => Some(ChoiceOption {
                key: option_letter(i),
                text: text.clone(),
            }),
            Value::Object(_) => serde_json::from_value(item.clone()).ok(),
            _ => None,
        })
        .collect()
}

fn option_letter(index: usize) -> String {
    let mut n = index;
    let mut out = String::new();
    loop {
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Draft,
    InProgress,
    Submitted,
    Graded,
    #[serde(other)]
    Unknown,
}

impl SubmissionStatus {
    pub fn is_final(self) -> bool {
        matches!(self, SubmissionStatus::Submitted | SubmissionStatus::Graded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default)]
    pub current_section: Option<SectionType>,
    #[serde(default)]
    pub section_time_remaining: Option<u64>,
    #[serde(default)]
    pub total_time_remaining: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    Locked,
    Available,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub status: SectionStatus,
}

/// Server-authoritative state of an official exam session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamStatus {
    #[serde(default)]
    pub current_section: Option<SectionType>,
    #[serde(default)]
    pub section_time_remaining: Option<u64>,
    #[serde(default)]
    pub total_time_remaining: Option<u64>,
    #[serde(default)]
    pub is_strict_mode: bool,
    #[serde(default)]
    pub sections: Vec<SectionProgress>,
    #[serde(default)]
    pub allows_section_switching: Option<bool>,
}

impl ExamStatus {
    pub fn allows_switching(&self) -> bool {
        !self.is_strict_mode && self.allows_section_switching.unwrap_or(true)
    }

    pub fn status_of(&self, section: SectionType) -> Option<SectionStatus> {
        self.sections
            .iter()
            .find(|s| s.section_type == section)
            .map(|s| s.status)
    }

    pub fn set_status(&mut self, section: SectionType, status: SectionStatus) {
        match self.sections.iter_mut().find(|s| s.section_type == section) {
            Some(entry) => entry.status = status,
            None => self.sections.push(SectionProgress {
                section_type: section,
                status,
            }),
        }
    }
}

/// Response of `complete-section`. `next_section: None` means the exam is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAdvance {
    pub success: bool,
    #[serde(default)]
    pub next_section: Option<SectionType>,
    #[serde(default)]
    pub section_time_remaining: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveAck {
    pub submission_id: i64,
}

/// Per-question grading returned by practice submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: i64,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub correct_answer: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed {
        submission: Submission,
    },
    Practice {
        results: Vec<QuestionResult>,
        questions: Vec<Value>,
    },
}

impl SubmitOutcome {
    pub fn is_practice(&self) -> bool {
        matches!(self, SubmitOutcome::Practice { .. })
    }
}

impl PartialEq for Submission {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.status == other.status && self.answers == other.answers
    }
}
