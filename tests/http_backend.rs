mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ieltsroom::answer::Answer;
use ieltsroom::client::{ExamBackend, HttpBackend, QuestionDraft};
use ieltsroom::config::Config;
use ieltsroom::engine::{SaveJob, SubmitRequest};
use ieltsroom::error::ApiError;
use ieltsroom::model::{QuestionType, SectionType, SubmissionStatus, SubmitOutcome};
use ieltsroom::normalize::{normalize, ExamSource};
use ieltsroom::room::{RoomCommand, RoomEvent};
use ieltsroom::runtime::Dispatcher;

type Reply = (StatusCode, Json<Value>);

#[derive(Clone)]
struct FakeServer {
    task: Arc<Value>,
    writes: Arc<Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer secret")
}

async fn get_task(State(server): State<FakeServer>, Path(id): Path<i64>) -> Reply {
    if id != 42 {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." })));
    }
    let mut task = (*server.task).clone();
    task["mocks"] = json!([7, 8]);
    (StatusCode::OK, Json(task))
}

async fn get_mock(State(server): State<FakeServer>, Path(id): Path<i64>) -> Reply {
    let found = server.task["mocks"]
        .as_array()
        .and_then(|mocks| mocks.iter().find(|m| m["id"] == json!(id)))
        .cloned();
    match found {
        Some(mock) => (StatusCode::OK, Json(mock)),
        None => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))),
    }
}

async fn start_session(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Authentication credentials were not provided." })),
        );
    }
    (StatusCode::OK, Json(json!({ "id": 9, "status": "DRAFT" })))
}

async fn save_answer(
    State(server): State<FakeServer>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    server
        .writes
        .lock()
        .unwrap()
        .push(json!({ "submission": id, "body": body }));
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn exam_status(Path(_id): Path<i64>) -> Reply {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "boom" })),
    )
}

async fn complete_section(Path(_id): Path<i64>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "success": false, "error": "Section already completed" })),
    )
}

async fn final_submit(Path(id): Path<i64>) -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "submission": { "id": id, "status": "SUBMITTED" } })),
    )
}

async fn practice_submit(Json(body): Json<Value>) -> Reply {
    let results: Vec<Value> = body["answers"]
        .as_object()
        .map(|answers| {
            answers
                .keys()
                .map(|k| json!({ "question_id": k.parse::<i64>().unwrap(), "is_correct": true }))
                .collect()
        })
        .unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({ "success": true, "is_practice": true, "results": results })),
    )
}

async fn create_question(Json(mut body): Json<Value>) -> Reply {
    body["id"] = json!(500);
    (StatusCode::CREATED, Json(body))
}

async fn spawn_server() -> (String, FakeServer) {
    let server = FakeServer {
        task: Arc::new(common::task_json()),
        writes: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/tasks/:id/", get(get_task))
        .route("/mocks/:id/", get(get_mock))
        .route("/submissions/start/", post(start_session))
        .route("/submissions/submit/", post(practice_submit))
        .route("/submissions/:id/answers/", patch(save_answer))
        .route("/submissions/:id/exam-status/", get(exam_status))
        .route("/submissions/:id/complete-section/", post(complete_section))
        .route("/submissions/:id/final-submit/", post(final_submit))
        .route("/mock-questions/", post(create_question))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://127.0.0.1:{}/", port), server)
}

fn backend(base: &str, token: Option<&str>) -> HttpBackend {
    let config = Config {
        api_url: base.to_string(),
        token: token.map(str::to_string),
        request_timeout: Duration::from_secs(5),
        ..Config::default()
    };
    HttpBackend::new(&config).unwrap()
}

#[tokio::test]
async fn test_task_bundle_resolves_mock_ids() {
    let (base, _) = spawn_server().await;
    let backend = backend(&base, Some("secret"));
    assert!(!backend.base_url().ends_with('/'));

    let task = backend.fetch_task_bundle(42).await.unwrap();
    let data = normalize(&ExamSource::Task(task)).unwrap();
    assert_eq!(data.total_questions, 4);
    assert_eq!(data.sections[1].audio_file.as_deref(), Some("listening/mock8.mp3"));

    match backend.fetch_mock(99).await {
        Err(ApiError::Status {
            status, message, ..
        }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not found.");
        }
        other => panic!("Expected 404, got {:?}", other.map(|m| m.id)),
    }
}

#[tokio::test]
async fn test_first_save_starts_session() {
    let (base, server) = spawn_server().await;
    let backend = backend(&base, Some("secret"));
    let job = SaveJob {
        submission_id: None,
        task_id: Some(42),
        question_id: "101".to_string(),
        answer: Answer::Single {
            value: "B".to_string(),
        },
        revision: 1,
    };

    let ack = backend.save_answer(&job).await.unwrap();
    assert_eq!(ack.submission_id, 9);
    let writes = server.writes.lock().unwrap().clone();
    assert_eq!(
        writes,
        vec![json!({
            "submission": 9,
            "body": { "question_id": "101", "answer": { "value": "B" } }
        })]
    );
}

#[tokio::test]
async fn test_missing_token_is_not_authorized() {
    let (base, _) = spawn_server().await;
    let backend = backend(&base, None);
    let err = backend.start_session(42).await.unwrap_err();
    assert_eq!(err.user_message(), "Not authorized");
    assert_eq!(err.endpoint(), "/submissions/start/");
}

#[tokio::test]
async fn test_error_bodies_are_mapped() {
    let (base, _) = spawn_server().await;
    let backend = backend(&base, Some("secret"));

    let rejected = backend
        .complete_section(9, SectionType::Reading)
        .await
        .unwrap_err();
    assert!(matches!(rejected, ApiError::Rejected { .. }));
    assert_eq!(rejected.user_message(), "Section already completed");

    let failed = backend.fetch_status(9).await.unwrap_err();
    assert!(matches!(failed, ApiError::Status { status: 500, .. }));
    assert_eq!(failed.user_message(), "Server error (500)");
}

#[tokio::test]
async fn test_final_submit_modes() {
    let (base, _) = spawn_server().await;
    let backend = backend(&base, Some("secret"));
    let mut request = SubmitRequest {
        submission_id: None,
        task_id: Some(42),
        mock_ids: vec![7, 8],
        answers: [(
            "101".to_string(),
            Answer::Single {
                value: "B".to_string(),
            },
        )]
        .into_iter()
        .collect(),
        forced: false,
        practice: true,
    };

    match backend.final_submit(&request).await.unwrap() {
        SubmitOutcome::Practice { results, .. } => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].question_id, 101);
            assert_eq!(results[0].is_correct, Some(true));
        }
        other => panic!("Expected practice results, got {:?}", other),
    }

    request.submission_id = Some(9);
    request.practice = false;
    match backend.final_submit(&request).await.unwrap() {
        SubmitOutcome::Completed { submission } => {
            assert_eq!(submission.id, 9);
            assert_eq!(submission.status, SubmissionStatus::Submitted);
        }
        other => panic!("Expected completed submission, got {:?}", other),
    }
}

#[tokio::test]
async fn test_authoring_creates_question() {
    let (base, _) = spawn_server().await;
    let backend = backend(&base, Some("secret"));
    let draft = QuestionDraft {
        section: 80,
        question_type: QuestionType::ShortAnswer,
        question_number_start: 7,
        question_number_end: 8,
        prompt: "Complete the notes.".to_string(),
        content: json!({}),
        correct_answer: None,
    };
    let question = backend.create_question(&draft).await.unwrap();
    assert_eq!(question.id, 500);
    assert_eq!(question.question_type, QuestionType::ShortAnswer);
    assert!(question.is_grouped());
}

#[tokio::test]
async fn test_dispatcher_feeds_results_back() {
    let (base, _) = spawn_server().await;
    let backend: Arc<dyn ExamBackend> = Arc::new(backend(&base, Some("secret")));
    let (mut dispatcher, mut events) =
        Dispatcher::new(backend, tokio::runtime::Handle::current());

    dispatcher.dispatch(RoomCommand::StartSession { task_id: 42 });
    match events.recv().await.unwrap() {
        RoomEvent::SessionStarted(Ok(submission)) => assert_eq!(submission.id, 9),
        other => panic!("Expected session, got {:?}", other),
    }

    dispatcher.dispatch(RoomCommand::ScheduleDeadline(Duration::from_millis(10)));
    let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, RoomEvent::DeadlineReached));
}
