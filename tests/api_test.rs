mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

async fn body_json(response: Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok_even_without_database() {
    let app = common::app_with(common::lazy_pool());
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["database"] == "up" || body["database"] == "down");
}

#[tokio::test]
async fn admin_routes_require_a_bearer_token() {
    let app = common::app_with(common::lazy_pool());
    let response = app
        .oneshot(get("/api/admin/assessments", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let app = common::app_with(common::lazy_pool());
    let token = common::expired_token("student-1", "student");
    let response = app
        .oneshot(get("/api/student/assessments", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_are_kept_apart() {
    let app = common::app_with(common::lazy_pool());

    let student = common::token("student-1", "student", None, None);
    let response = app
        .clone()
        .oneshot(get("/api/admin/assessments", Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = common::token("admin-1", "admin", None, None);
    let response = app
        .oneshot(get("/api/student/assessments", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_role_is_forbidden() {
    let app = common::app_with(common::lazy_pool());
    let token = common::token("who", "janitor", None, None);
    let response = app
        .oneshot(get("/api/student/attempts", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_assessment_payload_is_a_validation_error() {
    let app = common::app_with(common::lazy_pool());
    let admin = common::token("admin-1", "admin", None, None);
    let payload = json!({
        "title": "",
        "assessment_type": "quiz",
        "college": "GEC",
        "branch": "CSE",
        "start_time": "2026-03-01T10:00:00Z",
        "end_time": "2026-03-01T11:00:00Z",
        "questions": [{
            "question": "2+2?",
            "options": ["4"],
            "correct_option": "4",
            "marks": 1
        }]
    });
    let response = app
        .oneshot(post_json("/api/admin/assessments", &admin, payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "validation_failed");
}

#[tokio::test]
async fn unsupported_language_is_rejected_before_any_lookup() {
    let app = common::app_with(common::lazy_pool());
    let student = common::token("student-1", "student", None, None);
    let uri = format!(
        "/api/student/attempts/{}/problems/{}/run",
        Uuid::new_v4(),
        Uuid::new_v4()
    );
    let response = app
        .oneshot(post_json(
            &uri,
            &student,
            json!({"source_code": "puts 1", "language": "ruby"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("Unsupported language"));
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let app = common::app_with(common::lazy_pool());
    let student = common::token("student-1", "student", None, None);
    let response = app
        .oneshot(get("/api/student/attempts/not-a-uuid/results", Some(&student)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
