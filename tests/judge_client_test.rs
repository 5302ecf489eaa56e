use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessment_backend::models::question::TestCase;
use assessment_backend::services::judge_service::{
    ExecutionLimits, ExecutionRequest, Judge, Judge0Client, Language, VerdictStatus,
};
use assessment_backend::services::runner_service::TestCaseRunner;
use uuid::Uuid;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<JsonValue>>>,
    query: Arc<Mutex<Option<HashMap<String, String>>>>,
    api_key: Arc<Mutex<Option<String>>>,
}

async fn accepted(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<JsonValue>,
) -> impl IntoResponse {
    *captured.body.lock().unwrap() = Some(body);
    *captured.query.lock().unwrap() = Some(query);
    *captured.api_key.lock().unwrap() = headers
        .get("X-RapidAPI-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({
        "status": {"id": 3, "description": "Accepted"},
        "stdout": "4\n",
        "stderr": null,
        "compile_output": null,
        "message": null,
        "time": "0.015",
        "memory": 2048
    }))
}

async fn wrong_answer() -> impl IntoResponse {
    Json(json!({
        "status": {"id": 4, "description": "Wrong Answer"},
        "stdout": "5\n",
        "time": 0.01,
        "memory": 1024
    }))
}

async fn unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "judge is down")
}

async fn slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"status": {"id": 3, "description": "Accepted"}}))
}

async fn garbage() -> impl IntoResponse {
    "not json"
}

async fn spawn_fake_judge(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn request() -> ExecutionRequest {
    ExecutionRequest {
        source_code: "print(2 + 2)".into(),
        language: Language::Python,
        stdin: "".into(),
        expected_output: "4".into(),
        limits: ExecutionLimits {
            cpu_time_limit: 2.0,
            memory_limit_kb: 128_000,
        },
    }
}

fn client(addr: SocketAddr, timeout: Duration) -> Judge0Client {
    Judge0Client::new(
        format!("http://{}/", addr),
        Some("key-123".into()),
        Some("judge0.example".into()),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn maps_accepted_response_and_sends_expected_body() {
    let captured = Captured::default();
    let router = Router::new()
        .route("/submissions", post(accepted))
        .with_state(captured.clone());
    let addr = spawn_fake_judge(router).await;

    let verdict = client(addr, Duration::from_secs(5))
        .execute(&request())
        .await
        .unwrap();

    assert_eq!(verdict.status, VerdictStatus::Accepted);
    assert_eq!(verdict.stdout.as_deref(), Some("4\n"));
    assert_eq!(verdict.execution_time, Some(0.015));
    assert_eq!(verdict.memory, Some(2048));

    let body = captured.body.lock().unwrap().clone().unwrap();
    assert_eq!(body["language_id"], 71);
    assert_eq!(body["source_code"], "print(2 + 2)");
    assert_eq!(body["expected_output"], "4");
    assert_eq!(body["cpu_time_limit"], 2.0);
    assert_eq!(body["memory_limit"], 128_000);

    let query = captured.query.lock().unwrap().clone().unwrap();
    assert_eq!(query.get("base64_encoded").map(String::as_str), Some("false"));
    assert_eq!(query.get("wait").map(String::as_str), Some("true"));
    assert_eq!(captured.api_key.lock().unwrap().as_deref(), Some("key-123"));
}

#[tokio::test]
async fn maps_wrong_answer_with_numeric_time() {
    let addr = spawn_fake_judge(Router::new().route("/submissions", post(wrong_answer))).await;
    let verdict = client(addr, Duration::from_secs(5))
        .execute(&request())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::WrongAnswer);
    assert_eq!(verdict.description, "Wrong Answer");
    assert_eq!(verdict.execution_time, Some(0.01));
}

#[tokio::test]
async fn non_success_status_becomes_internal_error() {
    let addr = spawn_fake_judge(Router::new().route("/submissions", post(unavailable))).await;
    let verdict = client(addr, Duration::from_secs(5))
        .execute(&request())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::InternalError);
    assert!(verdict.message.unwrap().contains("503"));
}

#[tokio::test]
async fn request_timeout_becomes_internal_error() {
    let addr = spawn_fake_judge(Router::new().route("/submissions", post(slow))).await;
    let verdict = client(addr, Duration::from_millis(200))
        .execute(&request())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::InternalError);
    assert!(verdict.message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn undecodable_body_becomes_internal_error() {
    let addr = spawn_fake_judge(Router::new().route("/submissions", post(garbage))).await;
    let verdict = client(addr, Duration::from_secs(5))
        .execute(&request())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::InternalError);
    assert!(verdict.message.unwrap().contains("Invalid judge response"));
}

#[tokio::test]
async fn unreachable_judge_becomes_internal_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let verdict = client(addr, Duration::from_secs(2))
        .execute(&request())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::InternalError);
}

#[tokio::test]
async fn runner_reports_judge_timeout_as_error_case() {
    let addr = spawn_fake_judge(Router::new().route("/submissions", post(slow))).await;
    let runner = TestCaseRunner::new(
        Arc::new(client(addr, Duration::from_millis(200))),
        Duration::from_secs(20),
    );
    let case = TestCase {
        id: Uuid::new_v4(),
        problem_id: Uuid::new_v4(),
        case_number: 1,
        input: "2 2".into(),
        expected_output: "4".into(),
        is_hidden: false,
    };

    let outcome = runner
        .run(None, "print(4)", Language::Python, request().limits, &[case])
        .await;

    assert_eq!(outcome.passed_count, 0);
    let result = &outcome.results[0];
    assert_eq!(result.status, "Error");
    assert!(!result.passed);
    assert!(result.actual_output.contains("timed out"), "{}", result.actual_output);
    assert!(outcome.promoted.message.unwrap().contains("timed out"));
}
