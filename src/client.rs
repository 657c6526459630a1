//! Backend access. [`ExamBackend`] is the seam the runtime talks to;
//! [`HttpBackend`] is the reqwest implementation of it.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::answer::Answer;
use crate::config::Config;
use crate::engine::{SaveJob, SubmitRequest};
use crate::error::ApiError;
use crate::model::{
    ExamStatus, Mock, MockRef, Question, QuestionResult, QuestionType, SaveAck, SectionAdvance,
    SectionType, Submission, SubmitOutcome, Task,
};

#[async_trait]
pub trait ExamBackend: Send + Sync {
    async fn fetch_task(&self, task_id: i64) -> Result<Task, ApiError>;

    async fn fetch_mock(&self, mock_id: i64) -> Result<Mock, ApiError>;

    /// Task with every mock reference swapped for the full mock.
    async fn fetch_task_bundle(&self, task_id: i64) -> Result<Task, ApiError> {
        let mut task = self.fetch_task(task_id).await?;
        if let Some(refs) = task.mocks.take() {
            let resolved = try_join_all(refs.into_iter().map(|r| async move {
                match r {
                    MockRef::Id(id) => self.fetch_mock(id).await.map(|m| MockRef::Inline(Box::new(m))),
                    inline => Ok(inline),
                }
            }))
            .await?;
            task.mocks = Some(resolved);
        }
        Ok(task)
    }

    /// Creates the draft submission for a task, or returns the existing one.
    async fn start_session(&self, task_id: i64) -> Result<Submission, ApiError>;

    async fn save_answer(&self, job: &SaveJob) -> Result<SaveAck, ApiError>;

    async fn fetch_status(&self, submission_id: i64) -> Result<ExamStatus, ApiError>;

    async fn complete_section(
        &self,
        submission_id: i64,
        section: SectionType,
    ) -> Result<SectionAdvance, ApiError>;

    async fn switch_section(
        &self,
        submission_id: i64,
        section: SectionType,
    ) -> Result<ExamStatus, ApiError>;

    async fn final_submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, ApiError>;
}

/// Authoring payload for `POST /mock-questions/`.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDraft {
    pub section: i64,
    pub question_type: QuestionType,
    pub question_number_start: u32,
    pub question_number_end: u32,
    pub prompt: String,
    pub content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Value>,
}

/// Partial update for `PATCH /mock-questions/{id}/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number_end: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Approved,
    Rejected,
    NeedsRevision,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEvaluation {
    pub status: ReviewStatus,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    submission: Option<Submission>,
    #[serde(default)]
    is_practice: bool,
    #[serde(default)]
    results: Vec<QuestionResult>,
    #[serde(default)]
    questions: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct AnswerWrite<'a> {
    question_id: &'a str,
    answer: &'a Answer,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: config.base_url().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_question(&self, draft: &QuestionDraft) -> Result<Question, ApiError> {
        self.send(Method::POST, "/mock-questions/", Some(draft)).await
    }

    pub async fn update_question(&self, id: i64, patch: &QuestionPatch) -> Result<Question, ApiError> {
        self.send(Method::PATCH, &format!("/mock-questions/{}/", id), Some(patch))
            .await
    }

    pub async fn evaluate_review(&self, review_id: i64, evaluation: &ReviewEvaluation) -> Result<(), ApiError> {
        let _: Value = self
            .send(
                Method::POST,
                &format!("/reviews/{}/evaluate/", review_id),
                Some(evaluation),
            )
            .await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        debug!(%method, path, "backend request");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(|e| ApiError::Transport {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
        read_json(path, response).await
    }
}

/// Decodes a response body, mapping HTTP failures and `success: false` to errors.
async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let raw = response.text().await.map_err(|e| ApiError::Transport {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    let body: Value = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: format!("{} (status {})", e, status),
        })?
    };

    if !status.is_success() {
        warn!(endpoint, status = status.as_u16(), "backend returned an error status");
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::Rejected {
            endpoint: endpoint.to_string(),
            message: error_message(&body),
        });
    }
    serde_json::from_value(body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn error_message(body: &Value) -> String {
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| "no details".to_string())
}

#[async_trait]
impl ExamBackend for HttpBackend {
    async fn fetch_task(&self, task_id: i64) -> Result<Task, ApiError> {
        self.get(&format!("/tasks/{}/", task_id)).await
    }

    async fn fetch_mock(&self, mock_id: i64) -> Result<Mock, ApiError> {
        self.get(&format!("/mocks/{}/", mock_id)).await
    }

    async fn start_session(&self, task_id: i64) -> Result<Submission, ApiError> {
        self.send(
            Method::POST,
            "/submissions/start/",
            Some(&json!({ "task": task_id })),
        )
        .await
    }

    async fn save_answer(&self, job: &SaveJob) -> Result<SaveAck, ApiError> {
        let submission_id = match (job.submission_id, job.task_id) {
            (Some(id), _) => id,
            (None, Some(task_id)) => self.start_session(task_id).await?.id,
            (None, None) => {
                return Err(ApiError::Rejected {
                    endpoint: "/submissions/".to_string(),
                    message: "no task to attach the answer to".to_string(),
                })
            }
        };
        let write = AnswerWrite {
            question_id: &job.question_id,
            answer: &job.answer,
        };
        let _: Value = self
            .send(
                Method::PATCH,
                &format!("/submissions/{}/answers/", submission_id),
                Some(&write),
            )
            .await?;
        Ok(SaveAck { submission_id })
    }

    async fn fetch_status(&self, submission_id: i64) -> Result<ExamStatus, ApiError> {
        self.get(&format!("/submissions/{}/exam-status/", submission_id))
            .await
    }

    async fn complete_section(
        &self,
        submission_id: i64,
        section: SectionType,
    ) -> Result<SectionAdvance, ApiError> {
        self.send(
            Method::POST,
            &format!("/submissions/{}/complete-section/", submission_id),
            Some(&json!({ "section": section })),
        )
        .await
    }

    async fn switch_section(
        &self,
        submission_id: i64,
        section: SectionType,
    ) -> Result<ExamStatus, ApiError> {
        self.send(
            Method::POST,
            &format!("/submissions/{}/switch-section/", submission_id),
            Some(&json!({ "section": section })),
        )
        .await
    }

    async fn final_submit(&self, request: &SubmitRequest) -> Result<SubmitOutcome, ApiError> {
        let (path, body) = match request.submission_id {
            Some(id) => (
                format!("/submissions/{}/final-submit/", id),
                json!({ "answers": request.answers, "forced": request.forced }),
            ),
            None => (
                "/submissions/submit/".to_string(),
                json!({
                    "task": request.task_id,
                    "mock_ids": request.mock_ids,
                    "answers": request.answers,
                    "forced": request.forced,
                    "is_practice": request.practice,
                }),
            ),
        };
        let response: SubmitResponse = self.send(Method::POST, &path, Some(&body)).await?;
        if response.is_practice {
            return Ok(SubmitOutcome::Practice {
                results: response.results,
                questions: response.questions,
            });
        }
        match response.submission {
            Some(submission) => Ok(SubmitOutcome::Completed { submission }),
            None => Err(ApiError::Decode {
                endpoint: path,
                message: "response carries neither a submission nor practice results".to_string(),
            }),
        }
    }
}
