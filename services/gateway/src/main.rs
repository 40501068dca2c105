use anyhow::{Context, Result};
use pose_core::{GstBackend, MoveNetExtractor, MoveNetOptions, VideoPipeline};
use pose_gateway::api::{self, AppState};
use pose_gateway::config::GatewayConfig;
use pose_gateway::telemetry::{init_logging, init_metrics, shutdown_signal};
use pose_gateway::{JobQueue, Notifier, ObjectStore, Orchestrator, S3Store, StorageLayout, WorkerPool};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = GatewayConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;

    info!(
        service = %config.service.name,
        bucket = %config.storage.bucket,
        "Starting Pose Gateway"
    );

    init_metrics(&config.metrics)?;

    // Storage
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(&config.storage).await);
    let layout = StorageLayout::from(&config.storage);

    // Codec and model
    let backend = Arc::new(GstBackend::new().context("Failed to initialize GStreamer")?);
    let extractor = MoveNetExtractor::load(
        &config.model.path,
        MoveNetOptions {
            min_pose_confidence: config.model.min_pose_confidence,
            intra_threads: config.model.intra_threads,
        },
    )
    .with_context(|| format!("Failed to load model from {}", config.model.path.display()))?;
    info!(model = %config.model.path.display(), "Landmark model loaded");

    let pipeline = VideoPipeline::new(Arc::new(extractor));
    let orchestrator = Arc::new(
        Orchestrator::new(store.clone(), backend, pipeline, layout.clone())
            .with_scratch_root(config.worker.temp_dir.clone()),
    );

    let notifier = if config.notification.enabled {
        Some(Notifier::new(&config.notification).context("Failed to build notification client")?)
    } else {
        None
    };

    let (queue, pool): (JobQueue, WorkerPool) = WorkerPool::start(
        orchestrator,
        notifier,
        config.worker.num_workers,
        config.worker.queue_size,
    );

    let state = AppState {
        store,
        queue,
        layout: Arc::new(layout),
    };
    let router = api::create_router(state, &config.api);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;

    api::serve(listener, router, shutdown_signal())
        .await
        .context("HTTP server error")?;

    // The router (and its queue handle) is gone; workers drain what is queued.
    info!("Waiting for queued jobs to finish");
    pool.join().await;

    info!("Pose Gateway stopped");

    Ok(())
}
