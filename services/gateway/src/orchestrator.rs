//! Job orchestration: fetch, process, upload.
//!
//! Steps run strictly in sequence and any failure aborts the rest. The job's
//! scratch directory is removed on every exit path. When the video upload
//! succeeds and the angle upload then fails, the video object is left in
//! place; the two uploads are not transactional.

use crate::job::{JobKey, StorageLayout};
use crate::storage::{content_type_for, ObjectStore, StorageError};
use bytes::Bytes;
use pose_core::{PipelineError, SeriesError, VideoBackend, VideoPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors that abort a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to fetch input video: {0}")]
    Fetch(#[source] StorageError),

    #[error("Video processing failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Failed to upload result: {0}")]
    Upload(#[source] StorageError),

    #[error("Failed to serialize angle time-series: {0}")]
    Serialize(#[from] SeriesError),

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing task failed: {0}")]
    Worker(String),
}

/// Storage keys written by a successful job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub video_key: String,
    pub angles_key: String,
    pub frames_read: u64,
    pub frames_annotated: u64,
}

/// Runs one job end to end against injected storage, codec and model.
pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    backend: Arc<dyn VideoBackend>,
    pipeline: VideoPipeline,
    layout: StorageLayout,
    scratch_root: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        backend: Arc<dyn VideoBackend>,
        pipeline: VideoPipeline,
        layout: StorageLayout,
    ) -> Self {
        Self {
            store,
            backend,
            pipeline,
            layout,
            scratch_root: None,
        }
    }

    /// Create per-job scratch directories under `root` instead of the
    /// system temp dir.
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    fn scratch_dir(&self) -> Result<TempDir, std::io::Error> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pose-job-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    #[instrument(skip(self), fields(folder_id = %key))]
    pub async fn process_job(&self, key: &JobKey) -> Result<JobOutcome, JobError> {
        let start = Instant::now();
        let scratch = self.scratch_dir()?;
        let input_path = scratch.path().join(&self.layout.input_object);
        let output_path = scratch.path().join(&self.layout.video_object);

        let input_key = self.layout.input_key(key);
        let size = self
            .store
            .download_to_file(&input_key, &input_path)
            .await
            .map_err(JobError::Fetch)?;
        info!(key = %input_key, size_bytes = size, "Input video downloaded");

        let pipeline = self.pipeline.clone();
        let backend = self.backend.clone();
        let (input, output) = (input_path.clone(), output_path.clone());
        let report = tokio::task::spawn_blocking(move || {
            pipeline.process_file(backend.as_ref(), &input, &output)
        })
        .await
        .map_err(|e| JobError::Worker(e.to_string()))??;

        metrics::counter!("pose.frames.processed").increment(report.frames_read);
        metrics::counter!("pose.frames.annotated").increment(report.frames_annotated);

        let video_key = self.layout.video_key(key);
        let video = tokio::fs::read(&output_path).await?;
        self.store
            .put(
                &video_key,
                Bytes::from(video),
                content_type_for(&self.layout.video_object),
            )
            .await
            .map_err(JobError::Upload)?;

        let angles_key = self.layout.angles_key(key);
        let angles = report.series.to_json_vec()?;
        self.store
            .put(
                &angles_key,
                Bytes::from(angles),
                content_type_for(&self.layout.angles_object),
            )
            .await
            .map_err(JobError::Upload)?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
        } else {
            debug!(path = %scratch_path.display(), "Scratch directory removed");
        }

        info!(
            frames_read = report.frames_read,
            frames_annotated = report.frames_annotated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Job complete"
        );

        Ok(JobOutcome {
            video_key,
            angles_key,
            frames_read: report.frames_read,
            frames_annotated: report.frames_annotated,
        })
    }
}
