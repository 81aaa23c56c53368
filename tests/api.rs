//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{
    BrokenGpu, MockBackend, TEST_TOKEN, build_server_with_probe, build_test_server,
    gpu_with_free_mb, setup_models_file,
};

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying(""), None).router();

    let (status, json) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "AI Assistant API is running");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying(""), None).router();

    let (status, json) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_list_models() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying(""), None).router();

    let (status, json) = send(app, get("/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active_model"], "codellama");
    assert_eq!(json["models"]["codellama"]["name"], "codellama:7b");
    assert_eq!(json["models"]["codellama"]["is_active"], true);
    assert_eq!(json["models"]["tinyllama"]["is_active"], false);
    assert_eq!(json["models"]["tinyllama"]["tags"], json!(["small"]));
}

#[tokio::test]
async fn test_switch_persists_across_listing() {
    let (_dir, path) = setup_models_file();
    let server = build_test_server(&path, MockBackend::replying(""), None);

    let (status, json) = send(
        server.router(),
        post_empty("/models/switch?model_key=tinyllama", Some(TEST_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "success", "active_model": "tinyllama"}));

    let (_, json) = send(server.router(), get("/models")).await;
    assert_eq!(json["active_model"], "tinyllama");
    assert_eq!(json["models"]["tinyllama"]["is_active"], true);
    assert_eq!(json["models"]["codellama"]["is_active"], false);
}

#[tokio::test]
async fn test_switch_unknown_model_is_400() {
    let (_dir, path) = setup_models_file();
    let server = build_test_server(&path, MockBackend::replying(""), None);

    let (status, json) = send(
        server.router(),
        post_empty("/models/switch?model_key=mistral", Some(TEST_TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Model mistral not available");

    let (_, json) = send(server.router(), get("/models")).await;
    assert_eq!(json["active_model"], "codellama");
}

#[tokio::test]
async fn test_switch_requires_auth() {
    let (_dir, path) = setup_models_file();
    let server = build_test_server(&path, MockBackend::replying(""), None);

    let (status, json) = send(
        server.router(),
        post_empty("/models/switch?model_key=tinyllama", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"], "Invalid authorization header");

    let (_, json) = send(server.router(), get("/models")).await;
    assert_eq!(json["active_model"], "codellama");
}

#[tokio::test]
async fn test_chat_without_token_never_reaches_backend() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("hello");
    let server = build_test_server(&path, backend.clone(), None);

    let body = json!({"message": "hi"});

    let (status, _) = send(server.router(), post_json("/chat", None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(server.router(), post_json("/chat", Some("wrong"), &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["detail"], "Invalid token");

    let (status, _) = send(
        server.router(),
        post_json("/chat/optimized", Some("wrong"), &body),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_chat_json_mode_parses_fenced_block() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying(
        "Here you go:\n```json\n{\"colors\": [\"red\", \"green\"]}\n```",
    );
    let app = build_test_server(&path, backend.clone(), None).router();

    let (status, json) = send(
        app,
        post_json("/chat", Some(TEST_TOKEN), &json!({"message": "three colors"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], json!({"colors": ["red", "green"]}));
    assert_eq!(json["model_used"], "codellama");
    assert_eq!(json["tokens_used"], 17);

    let request = backend.last_request();
    assert_eq!(request.model, "codellama:7b");
    assert!(request.prompt.contains("Request: three colors"));
    assert_eq!(request.options.num_predict, Some(1000));
}

#[tokio::test]
async fn test_chat_json_mode_falls_back_to_raw_text() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying("just words"), None).router();

    let (status, json) = send(
        app,
        post_json("/chat", Some(TEST_TOKEN), &json!({"message": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], json!({"response": "just words"}));
}

#[tokio::test]
async fn test_chat_low_memory_clamps_tokens() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("ok");
    let server = build_test_server(&path, backend.clone(), None);

    let body = json!({"message": "hi", "max_tokens": 2000, "low_memory": true, "json_mode": false});
    let (status, _) = send(server.router(), post_json("/chat", Some(TEST_TOKEN), &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.last_request().options.num_predict, Some(512));
    assert_eq!(backend.last_request().prompt, "hi");

    let body = json!({"message": "hi", "max_tokens": 200, "low_memory": true});
    send(server.router(), post_json("/chat", Some(TEST_TOKEN), &body)).await;
    assert_eq!(backend.last_request().options.num_predict, Some(200));
}

#[tokio::test]
async fn test_chat_low_memory_caps_unset_tokens() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("ok");
    let server = build_test_server(&path, backend.clone(), None);

    let body = json!({"message": "hi", "max_tokens": null, "low_memory": true});
    let (status, _) = send(server.router(), post_json("/chat", Some(TEST_TOKEN), &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(backend.last_request().options.num_predict, Some(512));

    // Without low memory an explicit null stays uncapped
    let body = json!({"message": "hi", "max_tokens": null});
    send(server.router(), post_json("/chat", Some(TEST_TOKEN), &body)).await;
    assert_eq!(backend.last_request().options.num_predict, None);
}

#[tokio::test]
async fn test_chat_forwards_token_values_unchecked() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("ok");
    let app = build_test_server(&path, backend.clone(), None).router();

    let body = json!({"message": "hi", "max_tokens": -1, "temperature": 7.5});
    let (status, _) = send(app, post_json("/chat", Some(TEST_TOKEN), &body)).await;

    assert_eq!(status, StatusCode::OK);
    let request = backend.last_request();
    assert_eq!(request.options.num_predict, Some(-1));
    assert!((request.options.temperature - 7.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_chat_unknown_model_is_400() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("ok");
    let app = build_test_server(&path, backend.clone(), None).router();

    let (status, json) = send(
        app,
        post_json(
            "/chat",
            Some(TEST_TOKEN),
            &json!({"message": "hi", "model": "mistral"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Model mistral not available");
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_chat_backend_failure_is_generic_500() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::failing(), None).router();

    let (status, json) = send(
        app,
        post_json("/chat", Some(TEST_TOKEN), &json!({"message": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Error communicating with AI model");
}

#[tokio::test]
async fn test_status_reports_backend_models() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying(""), None).router();

    let (status, json) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "status": "running",
            "ollama_available": true,
            "active_model": "codellama",
            "available_models": 3
        })
    );
}

#[tokio::test]
async fn test_status_degrades_when_backend_down() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::failing(), None).router();

    let (status, json) = send(app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "status": "error",
            "ollama_available": false,
            "active_model": null,
            "available_models": 0
        })
    );
}

#[tokio::test]
async fn test_system_status_without_gpu() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(&path, MockBackend::replying(""), None).router();

    let (status, json) = send(app, get("/system/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "running");
    assert!(json.get("gpu").is_none());
    assert!(json["cpu_percent"].is_number());
    assert!(json["memory_percent"].is_number());
}

#[tokio::test]
async fn test_system_status_with_failing_gpu_probe() {
    let (_dir, path) = setup_models_file();
    let app =
        build_server_with_probe(&path, MockBackend::replying(""), Box::new(BrokenGpu)).router();

    let (status, json) = send(app, get("/system/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["gpu"], "Not available");
    assert_eq!(json["active_model"], "codellama");
}

#[tokio::test]
async fn test_system_status_with_gpu() {
    let (_dir, path) = setup_models_file();
    let app = build_test_server(
        &path,
        MockBackend::replying(""),
        Some(gpu_with_free_mb(1500.0)),
    )
    .router();

    let (_, json) = send(app, get("/system/status")).await;

    assert_eq!(json["gpu"]["name"], "NVIDIA GeForce GTX 1050");
    assert_eq!(json["gpu"]["memory_free_mb"], 1500.0);
    assert_eq!(json["gpu"]["load_percent"], 12.0);
}

#[tokio::test]
async fn test_optimized_chat_warns_on_low_vram() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("ok");
    let app = build_test_server(&path, backend.clone(), Some(gpu_with_free_mb(600.0))).router();

    let (status, json) = send(
        app,
        post_json("/chat/optimized", Some(TEST_TOKEN), &json!({"message": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["warning"], "Low VRAM available, response may be slow");
    assert_eq!(json["suggestion"], "Try using tinyllama model");
    assert_eq!(json["vram_free_mb"], 600.0);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_optimized_chat_clamps_tokens() {
    let (_dir, path) = setup_models_file();
    let backend = MockBackend::replying("{\"ok\": true}");
    let server = build_test_server(&path, backend.clone(), Some(gpu_with_free_mb(1500.0)));

    let (status, json) = send(
        server.router(),
        post_json(
            "/chat/optimized",
            Some(TEST_TOKEN),
            &json!({"message": "hi", "max_tokens": 4096}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], json!({"ok": true}));
    assert_eq!(backend.last_request().options.num_predict, Some(512));

    // Without GPU stats the request goes straight through
    let server = build_test_server(&path, backend.clone(), None);
    send(
        server.router(),
        post_json(
            "/chat/optimized",
            Some(TEST_TOKEN),
            &json!({"message": "hi", "max_tokens": 4096, "low_memory_mode": false}),
        ),
    )
    .await;
    assert_eq!(backend.last_request().options.num_predict, Some(4096));
}
