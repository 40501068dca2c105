//! HTTP surface.
//!
//! - `GET /health`: bucket connectivity probe
//! - `POST /process-video`: enqueue a job for `folder_id`
//! - `POST /storage-events`: enqueue a job when an input video lands in the
//!   bucket (object-finalize notifications)

use crate::config::ApiConfig;
use crate::job::{JobKey, StorageLayout};
use crate::storage::ObjectStore;
use crate::worker::{JobQueue, JobRequest, QueueError};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub queue: JobQueue,
    pub layout: Arc<StorageLayout>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessVideoRequest {
    pub folder_id: String,
    #[serde(default)]
    pub notification_url: Option<String>,
}

/// Object-finalize notification; only the object name is used.
#[derive(Debug, Deserialize)]
pub struct StorageEvent {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/process-video", post(process_video))
        .route("/storage-events", post(storage_event))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusResponse::new(
                "healthy",
                "Service is running and storage connection is active",
            )),
        ),
        Err(e) => {
            error!(bucket = %state.store.bucket(), error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse::new(
                    "unhealthy",
                    "Service is unhealthy: storage connection failed",
                )),
            )
        }
    }
}

fn enqueue(state: &AppState, key: JobKey, notification_url: Option<String>) -> Result<(), ApiError> {
    match state.queue.submit(JobRequest::new(key.clone(), notification_url)) {
        Ok(()) => {
            metrics::counter!("pose.jobs.accepted").increment(1);
            info!(folder_id = %key, "Job enqueued");
            Ok(())
        }
        Err(e) => {
            metrics::counter!("pose.jobs.rejected").increment(1);
            warn!(folder_id = %key, error = %e, "Job rejected");
            let code = match e {
                QueueError::Full => "QUEUE_FULL",
                QueueError::Closed => "SHUTTING_DOWN",
            };
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, code, e.to_string()))
        }
    }
}

#[instrument(skip(state, request), fields(folder_id = %request.folder_id))]
async fn process_video(
    State(state): State<AppState>,
    Json(request): Json<ProcessVideoRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!("Received video processing request");

    let key = JobKey::parse(&request.folder_id).map_err(|e| {
        metrics::counter!("pose.jobs.rejected").increment(1);
        api_error(StatusCode::BAD_REQUEST, "INVALID_FOLDER_ID", e.to_string())
    })?;

    enqueue(&state, key.clone(), request.notification_url)?;

    Ok(Json(StatusResponse::new(
        "accepted",
        format!("Processing video for folder_id: {}", key),
    )))
}

#[instrument(skip(state, event), fields(object = %event.name))]
async fn storage_event(
    State(state): State<AppState>,
    Json(event): Json<StorageEvent>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Some(key) = state.layout.job_for_upload(&event.name) else {
        info!("Not a target video file");
        return Ok(Json(StatusResponse::new(
            "ignored",
            format!("Not a target video file: {}", event.name),
        )));
    };

    info!(folder_id = %key, "New video detected");
    enqueue(&state, key.clone(), None)?;

    Ok(Json(StatusResponse::new(
        "accepted",
        format!("Processing video for folder_id: {}", key),
    )))
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "HTTP server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
