mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{orchestrator, GatedStore};
use http_body_util::BodyExt;
use pose_gateway::config::ApiConfig;
use pose_gateway::{create_router, AppState, MemoryStore, ObjectStore, StorageLayout, WorkerPool};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router_with(store: Arc<dyn ObjectStore>, num_workers: usize, queue_size: usize) -> (Router, WorkerPool) {
    let orchestrator = Arc::new(orchestrator(store.clone(), &[]));
    let (queue, pool) = WorkerPool::start(orchestrator, None, num_workers, queue_size);
    let state = AppState {
        store,
        queue,
        layout: Arc::new(StorageLayout::default()),
    };
    (create_router(state, &ApiConfig::default()), pool)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_ok() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 1, 4);

    let (status, body) = call(&router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(
        body["message"],
        "Service is running and storage connection is active"
    );
}

#[tokio::test]
async fn test_health_unavailable_when_bucket_unreachable() {
    let store = Arc::new(MemoryStore::new("videos"));
    store.set_healthy(false);
    let (router, _pool) = router_with(store, 1, 4);

    let (status, body) = call(&router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_process_video_accepted() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 1, 4);

    let (status, body) = call(
        &router,
        "POST",
        "/process-video",
        Some(json!({ "folder_id": "session-42" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["message"], "Processing video for folder_id: session-42");
}

#[tokio::test]
async fn test_process_video_rejects_invalid_folder_id() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 1, 4);

    for folder_id in ["", "../etc", "a/b"] {
        let (status, body) = call(
            &router,
            "POST",
            "/process-video",
            Some(json!({ "folder_id": folder_id })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "folder_id {folder_id:?}");
        assert_eq!(body["code"], "INVALID_FOLDER_ID");
    }
}

#[tokio::test]
async fn test_process_video_queue_full() {
    let store = Arc::new(GatedStore::new());
    let (router, _pool) = router_with(store.clone(), 1, 1);
    let request = || Some(json!({ "folder_id": "busy" }));

    // First job occupies the only worker.
    let (status, _) = call(&router, "POST", "/process-video", request()).await;
    assert_eq!(status, StatusCode::OK);
    store.started.notified().await;

    // Second fills the queue, third is turned away.
    let (status, _) = call(&router, "POST", "/process-video", request()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&router, "POST", "/process-video", request()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "QUEUE_FULL");

    store.release.notify_waiters();
}

#[tokio::test]
async fn test_process_video_without_workers_is_shutting_down() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 0, 4);

    let (status, body) = call(
        &router,
        "POST",
        "/process-video",
        Some(json!({ "folder_id": "late" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SHUTTING_DOWN");
}

#[tokio::test]
async fn test_storage_event_for_input_video() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 1, 4);

    let (status, body) = call(
        &router,
        "POST",
        "/storage-events",
        Some(json!({ "name": "exercise_videos/abc/video.mp4" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["message"], "Processing video for folder_id: abc");
}

#[tokio::test]
async fn test_storage_event_ignores_other_objects() {
    let store = Arc::new(MemoryStore::new("videos"));
    let (router, _pool) = router_with(store, 1, 4);

    for name in [
        "exercise_videos/abc/pose_video.mp4",
        "exercise_videos/abc/pose_angles.json",
        "exercise_videos/abc/nested/video.mp4",
        "other/abc/video.mp4",
    ] {
        let (status, body) = call(
            &router,
            "POST",
            "/storage-events",
            Some(json!({ "name": name })),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "object {name}");
        assert_eq!(body["status"], "ignored", "object {name}");
    }
}
