//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wispwell_scene::application::coordinator::SceneCoordinator;
use wispwell_state_store::file_definition_repository::FileSceneDefinitionRepository;
use wispwell_state_store::file_state_repository::FileSceneStateRepository;
use wispwell_test_support::FixedClock;

use wispwell_api::state::AppState;

/// Two-character scene used across the integration tests.
pub const GREETING_SCENE: &str = r#"{
    "start": { "speaker": "Orlin", "text": "Welcome to the Wispwell.", "wait": 0, "next": "reply" },
    "reply": { "speaker": "Elroi", "text": "Glad to be here.", "wait": 0, "next": { "continue": "farewell", "leave": "reply" } },
    "farewell": { "speaker": "Orlin", "text": "Safe travels.", "wait": 0 }
}"#;

/// Writes `GREETING_SCENE` as `scene1_orlin.json` under `<root>/dialogue`.
pub fn seed_scenes(root: &Path) {
    let dir = root.join("dialogue");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("scene1_orlin.json"), GREETING_SCENE).unwrap();
}

/// Builds app state over file-backed stores rooted at `root`, with a fixed
/// clock.
pub fn file_backed_state(root: &Path) -> AppState {
    let coordinator = SceneCoordinator::new(
        Arc::new(FileSceneDefinitionRepository::new(root.join("dialogue"))),
        Arc::new(FileSceneStateRepository::new(root.join("scene_state.json"))),
        Arc::new(FixedClock::morning()),
    );
    AppState::new(Arc::new(coordinator))
}

/// Builds the full app router the way `main.rs` does.
pub fn build_test_app(state: AppState) -> Router {
    wispwell_api::build_router(state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
