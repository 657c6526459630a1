use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::answer::{is_answered, is_fully_answered, Answer};
use crate::error::PersistError;
use crate::normalize::NormalizedData;

/// Local copy of a session's answers, rewritten after every change. Answers
/// in it are resent on the next start, so an outage never loses an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftFile {
    pub session: DraftSession,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSession {
    pub task_key: String,
    pub title: String,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub submission_id: Option<i64>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DraftCache {
    dir: PathBuf,
    key: String,
    title: String,
    task_id: Option<i64>,
}

impl DraftCache {
    pub fn new(dir: impl Into<PathBuf>, data: &NormalizedData) -> Self {
        Self {
            dir: dir.into(),
            key: task_key(data),
            title: data.meta.title.clone(),
            task_id: data.meta.task_id,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> PathBuf {
        let name = self.key.trim_start_matches("sha256:");
        self.dir.join(format!("{}.yaml", &name[..name.len().min(16)]))
    }

    pub fn load(&self) -> Result<Option<DraftFile>, PersistError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| PersistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let draft: DraftFile = serde_yaml::from_str(&content).map_err(|e| PersistError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if draft.session.task_key != self.key {
            return Err(PersistError::Corrupt {
                path: path.display().to_string(),
                message: "draft belongs to a different exam".to_string(),
            });
        }
        debug!(path = %path.display(), answers = draft.answers.len(), "loaded local draft");
        Ok(Some(draft))
    }

    pub fn save(
        &self,
        submission_id: Option<i64>,
        answers: &BTreeMap<String, Answer>,
        now: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        let draft = DraftFile {
            session: DraftSession {
                task_key: self.key.clone(),
                title: self.title.clone(),
                task_id: self.task_id,
                submission_id,
                saved_at: now,
            },
            answers: answers.clone(),
        };
        let yaml = serde_yaml::to_string(&draft).map_err(|e| PersistError::Encode(e.to_string()))?;
        atomic_write(&self.path(), &yaml)
    }

    pub fn clear(&self) -> Result<(), PersistError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).map_err(|source| PersistError::Io {
                path: path.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Default location of draft files.
pub fn default_draft_dir() -> PathBuf {
    ProjectDirs::from("", "", "ieltsroom")
        .map(|dirs| dirs.data_local_dir().join("drafts"))
        .unwrap_or_else(|| PathBuf::from(".ieltsroom").join("drafts"))
}

pub fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "ieltsroom")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from(".ieltsroom").join("logs"))
}

/// Stable identity of an exam: the task id, or the mock ids for template practice.
pub fn task_key(data: &NormalizedData) -> String {
    let identity = match data.meta.task_id {
        Some(id) => format!("task:{}", id),
        None => {
            let ids: Vec<String> = data.mocks.iter().map(|m| m.id.to_string()).collect();
            format!("mock:{}", ids.join(","))
        }
    };
    compute_str_hash(&identity)
}

fn atomic_write(path: &Path, content: &str) -> Result<(), PersistError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).map_err(|source| PersistError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

pub fn export_answers(draft: &DraftFile, path: &Path) -> Result<(), PersistError> {
    let yaml = serde_yaml::to_string(draft).map_err(|e| PersistError::Encode(e.to_string()))?;
    fs::write(path, yaml).map_err(|source| PersistError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReport {
    pub title: String,
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub answered: usize,
    pub fully_answered: usize,
    pub total: usize,
    pub sections: Vec<SectionReport>,
}

pub fn status_report(data: &NormalizedData, answers: &BTreeMap<String, Answer>) -> StatusReport {
    let mut report = StatusReport {
        answered: 0,
        fully_answered: 0,
        total: data.total_questions,
        sections: Vec::with_capacity(data.sections.len()),
    };
    for section in &data.sections {
        let mut answered = 0;
        for q in &section.questions {
            let Some(a) = answers.get(&q.key()) else {
                continue;
            };
            if is_answered(q, a) {
                answered += 1;
            }
            if is_fully_answered(q, a) {
                report.fully_answered += 1;
            }
        }
        report.answered += answered;
        report.sections.push(SectionReport {
            title: section.title.clone(),
            answered,
            total: section.questions.len(),
        });
    }
    report
}

pub fn print_status(data: &NormalizedData, draft: Option<&DraftFile>) {
    let empty = BTreeMap::new();
    let answers = draft.map(|d| &d.answers).unwrap_or(&empty);
    let report = status_report(data, answers);
    println!("Exam: {}", data.meta.title);
    println!("Questions: {}", report.total);
    println!(
        "  Answered: {}, Fully answered: {}, Not answered: {}",
        report.answered,
        report.fully_answered,
        report.total.saturating_sub(report.answered)
    );
    for section in &report.sections {
        println!("  {}: {}/{}", section.title, section.answered, section.total);
    }
    match draft {
        Some(d) => println!("Last saved: {}", d.session.saved_at.to_rfc3339()),
        None => println!("No local draft"),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn compute_str_hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("sha256:{}", hex_encode(&result))
}
