//! API endpoint integration tests
//!
//! Exercises the HTTP surface with tower oneshot requests. Upstream
//! collaborators are unconfigured, so these tests cover request
//! validation, log writing, and the 503 paths without any network.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

mod common;
use common::build_test_router;

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn ready_reports_unconfigured_collaborators() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["generation"]["status"], "unavailable");
    assert_eq!(json["checks"]["synthesis"]["status"], "unavailable");
    assert_eq!(json["checks"]["recognition"]["status"], "unavailable");
    assert_eq!(json["checks"]["session_log"]["status"], "ok");
}

#[tokio::test]
async fn chat_without_text_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/chat", &serde_json::json!({ "text": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn chat_without_generator_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/chat", &serde_json::json!({ "text": "hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "not_configured");
}

#[tokio::test]
async fn synthesize_without_text_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/synthesize", &serde_json::json!({ "speaker": "AI_1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ai_response_without_speaker_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json(
            "/v4/ai-response",
            &serde_json::json!({ "memory": [], "topic": "Anything" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "No speaker provided");
}

#[tokio::test]
async fn analyze_session_requires_transcript_and_topic() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json(
            "/v4/analyze-session",
            &serde_json::json!({ "topic": "Remote work" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Missing transcript or topic");
}

#[tokio::test]
async fn generate_topic_without_generator_is_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/v4/generate-topic", &serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn session_lifecycle_appends_to_the_log() {
    let dir = tempfile::tempdir().unwrap();

    let response = build_test_router(dir.path())
        .oneshot(post_json(
            "/v4/start-session",
            &serde_json::json!({ "topic": "Are degrees obsolete?", "userName": "Priya" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let response = build_test_router(dir.path())
        .oneshot(post_json(
            "/v4/log-speech",
            &serde_json::json!({
                "speaker": "AI_1",
                "text": "Let me frame the discussion.",
                "turnNumber": 1,
                "duration": 21.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = build_test_router(dir.path())
        .oneshot(post_json(
            "/v4/end-session",
            &serde_json::json!({ "totalDuration": "4m 12s", "totalTurns": 9, "userTurns": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let log = std::fs::read_to_string(dir.path().join("gd_session.log")).unwrap();
    assert!(log.contains("NEW GD SESSION"));
    assert!(log.contains("Topic: Are degrees obsolete?"));
    assert!(log.contains("Participant: Priya"));
    assert!(log.contains("Parth: Let me frame the discussion."));
    assert!(log.contains("[Turn 1 | AI | ~21.5s]"));
    assert!(log.contains("SESSION SUMMARY"));
    assert!(log.contains("User Turns: 2"));
}

#[tokio::test]
async fn log_speech_without_speaker_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/v4/log-speech", &serde_json::json!({ "text": "hi" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_without_static_dir_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
