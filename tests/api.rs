use axum::{ body::{ to_bytes, Body }, http::{ Request, StatusCode }, Router };
use madai_agent::conversation::SubmissionPolicy;
use madai_agent::dashboard::{ Dashboard, DashboardConfig };
use madai_agent::gateway::ChatConfig;
use madai_agent::server::api::router;
use serde_json::{ json, Value };
use tower::ServiceExt;
use url::Url;

fn offline_dashboard() -> Dashboard {
    Dashboard::new(DashboardConfig {
        chat: ChatConfig {
            base_url: Url::parse("http://127.0.0.1:1/chat").unwrap(),
            api_key: None,
            offline: true,
        },
        keys_url: None,
        bots_url: None,
        webhook_url: None,
        knowledge_url: None,
        policy: SubmissionPolicy::Interleave,
    })
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn message_round_trip_through_local_responder() {
    let dashboard = offline_dashboard();
    let app = router(dashboard.clone(), None);

    let (status, body) = call(&app, json_request("POST", "/api/messages", json!({"message": "3*4"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_message"]["content"], "3*4");
    assert_eq!(body["source"], "local");
    assert!(body["reply"]["content"].as_str().unwrap().contains("**12**"));

    let (status, body) = call(&app, get("/api/messages")).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[2]["role"], "assistant");
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let app = router(offline_dashboard(), None);
    let (status, _) = call(&app, json_request("POST", "/api/messages", json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_key_guard() {
    let app = router(offline_dashboard(), Some("local-secret".into()));

    let (status, body) = call(&app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let req = Request::builder()
        .uri("/api/stats")
        .header("X-Api-Key", "local-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"], 1);
}

#[tokio::test]
async fn training_examples_crud() {
    let app = router(offline_dashboard(), None);

    let (status, _) = call(
        &app,
        json_request("POST", "/api/training", json!({"input": "2+2", "output": "", "category": "math"}))
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = call(
        &app,
        json_request("POST", "/api/training", json!({"input": "2+2", "output": "4", "category": "math"}))
    ).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = call(&app, get("/api/training")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/training?id={}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, notices) = call(&app, get("/api/notices")).await;
    let titles: Vec<&str> = notices
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Заполните все поля", "Пример добавлен!", "Пример удален"]);
}

#[tokio::test]
async fn unconfigured_key_service_is_unavailable() {
    let app = router(offline_dashboard(), None);
    let (status, body) = call(&app, get("/api/keys")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "key service is not configured");
}
