use axum::http::StatusCode;
use axum::body::Body;
use http_body_util::BodyExt;
use tower::ServiceExt;
use serde_json::{json, Value};
use flowscope::api::{build_router, AppState};
use flowscope::control_plane::HttpControlPlane;
use flowscope::controller::{ControllerSettings, ExecutionController};
use flowscope::stream::ChannelTransport;
use flowscope::workflow::TaskCatalog;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_state() -> AppState {
    // Nothing listens on the discard port, so backend calls fail fast.
    create_state_with_backend("http://127.0.0.1:9")
}

fn create_state_with_backend(base_url: &str) -> AppState {
    let control_plane = HttpControlPlane::new(base_url, Duration::from_secs(5)).unwrap();
    let controller = ExecutionController::new(
        ControllerSettings::default(),
        Arc::new(control_plane),
        Arc::new(ChannelTransport::new()),
    );
    AppState::new(controller, TaskCatalog::builtin())
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let req = make_request("GET", "/api/health", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "flowscope");
}

#[tokio::test]
async fn test_list_tasks() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/tasks", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total"], 4);
    let review = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["taskId"] == "contract-review")
        .unwrap();
    assert_eq!(review["isLiveExecution"], false);
    assert_eq!(review["steps"].as_array().unwrap().len(), 5);
    assert_eq!(review["steps"][0]["agentName"], "Coordinator");
}

#[tokio::test]
async fn test_layout_for_count() {
    let state = create_test_state();
    let response = app(&state).oneshot(make_request("GET", "/api/layout?n=4", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let positions = body["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 4);
    // First node at the top, second at three o'clock.
    assert!((positions[0]["x"].as_f64().unwrap() - 50.0).abs() < 1e-9);
    assert!((positions[0]["y"].as_f64().unwrap() - 15.0).abs() < 1e-9);
    assert!((positions[1]["x"].as_f64().unwrap() - 85.0).abs() < 1e-9);

    let response = app(&state).oneshot(make_request("GET", "/api/layout?n=0", None)).await.unwrap();
    let body = response_json(response).await;
    assert!(body["positions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_start_and_read_execution() {
    let state = create_test_state();

    let req = make_request("POST", "/api/execution", Some(json!({"taskId": "market-brief"})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    assert!(session_id.starts_with("session_"));

    let response = app(&state).oneshot(make_request("GET", "/api/execution", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["sessionId"], session_id);
    assert_eq!(body["totalSteps"], 4);
    assert_eq!(body["connectionStatus"], "disconnected");

    let response = app(&state).oneshot(make_request("GET", "/api/layout", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["positions"].as_array().unwrap().len(), 4);
    assert_eq!(body["positions"][0]["agentId"], "scout");

    let response = app(&state).oneshot(make_request("DELETE", "/api/execution", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["stopped"], true);
}

#[tokio::test]
async fn test_start_unknown_task_is_not_found() {
    let state = create_test_state();
    let req = make_request("POST", "/api/execution", Some(json!({"taskId": "nope"})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_clear_selection_is_nothing_to_execute() {
    let state = create_test_state();
    let req = make_request("POST", "/api/execution", Some(json!({})));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["status"], "nothing-to-execute");

    let response = app(&state).oneshot(make_request("POST", "/api/execution/start", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_gated_task_refuses_start_before_upload() {
    let state = create_test_state();
    let req = make_request("POST", "/api/execution", Some(json!({"taskId": "document-analysis"})));
    app(&state).oneshot(req).await.unwrap();

    let response = app(&state).oneshot(make_request("POST", "/api/execution/start", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["started"], false);

    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/api/execution/upload?name=brief.pdf")
        .body(Body::from(vec![1u8, 2, 3]))
        .unwrap();
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    // Backend unreachable: the failure is reported, not raised.
    assert_eq!(body["uploaded"], false);

    let response = app(&state).oneshot(make_request("GET", "/api/execution", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["executionStarted"], false);
    assert!(body["logs"][0].as_str().unwrap().contains("Upload failed"));
}

#[tokio::test]
async fn test_view_stays_readable_during_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true}))
                .set_delay(Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let state = create_state_with_backend(&server.uri());
    let req = make_request("POST", "/api/execution", Some(json!({"taskId": "document-analysis"})));
    app(&state).oneshot(req).await.unwrap();

    let upload = axum::http::Request::builder()
        .method("POST")
        .uri("/api/execution/upload?name=brief.pdf")
        .body(Body::from(vec![1u8, 2, 3]))
        .unwrap();
    let in_flight = tokio::spawn(app(&state).oneshot(upload));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let read = app(&state).oneshot(make_request("GET", "/api/execution", None));
    let response = tokio::time::timeout(Duration::from_millis(500), read)
        .await
        .expect("view blocked behind the upload")
        .unwrap();
    let body = response_json(response).await;
    assert!(body["logs"][0].as_str().unwrap().contains("Uploading brief.pdf"));

    let response = in_flight.await.unwrap().unwrap();
    let body = response_json(response).await;
    assert_eq!(body["uploaded"], true);
}
