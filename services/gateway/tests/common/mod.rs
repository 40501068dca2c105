#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use pose_core::video::raw;
use pose_core::{
    ExtractError, Frame, Landmark, LandmarkExtractor, LandmarkPoint, LandmarkSet, RawVideoBackend,
    VideoInfo, VideoPipeline,
};
use pose_gateway::{ObjectStore, Orchestrator, StorageError, StorageLayout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn full_pose(shift: f32) -> LandmarkSet {
    LandmarkSet::new()
        .with(Landmark::Nose, LandmarkPoint::new(0.5, 0.1, 1.0))
        .with(Landmark::LeftShoulder, LandmarkPoint::new(0.6, 0.3, 1.0))
        .with(Landmark::RightShoulder, LandmarkPoint::new(0.4, 0.3, 1.0))
        .with(Landmark::LeftElbow, LandmarkPoint::new(0.65, 0.4, 1.0))
        .with(Landmark::RightElbow, LandmarkPoint::new(0.35, 0.4, 1.0))
        .with(Landmark::LeftWrist, LandmarkPoint::new(0.6 + shift, 0.5, 1.0))
        .with(Landmark::RightWrist, LandmarkPoint::new(0.3, 0.5, 1.0))
        .with(Landmark::LeftHip, LandmarkPoint::new(0.6, 0.6, 1.0))
        .with(Landmark::RightHip, LandmarkPoint::new(0.4, 0.6, 1.0))
        .with(Landmark::LeftKnee, LandmarkPoint::new(0.6, 0.75, 1.0))
        .with(Landmark::RightKnee, LandmarkPoint::new(0.4, 0.75, 1.0))
        .with(Landmark::LeftAnkle, LandmarkPoint::new(0.6, 0.9, 1.0))
        .with(Landmark::RightAnkle, LandmarkPoint::new(0.4, 0.9, 1.0))
}

/// Sees no subject in frames whose first byte is listed in `blind`.
pub struct ScriptedExtractor {
    pub blind: Vec<u8>,
}

impl LandmarkExtractor for ScriptedExtractor {
    fn extract(&self, frame: &Frame) -> Result<Option<LandmarkSet>, ExtractError> {
        let marker = frame.data()[0];
        if self.blind.contains(&marker) {
            return Ok(None);
        }
        Ok(Some(full_pose(marker as f32 / 100.0)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Raw-container video of `count` frames, frame `i` filled with `[i, 0, 0]`.
pub fn raw_video(count: u8) -> Vec<u8> {
    let info = VideoInfo::new(32, 24, 30, 1);
    let frames: Vec<Frame> = (0..count).map(|i| Frame::filled(32, 24, [i, 0, 0])).collect();
    raw::encode(info, &frames)
}

pub fn orchestrator(store: Arc<dyn ObjectStore>, blind: &[u8]) -> Orchestrator {
    orchestrator_in(store, blind, None)
}

pub fn orchestrator_in(
    store: Arc<dyn ObjectStore>,
    blind: &[u8],
    scratch_root: Option<PathBuf>,
) -> Orchestrator {
    let pipeline = VideoPipeline::new(Arc::new(ScriptedExtractor {
        blind: blind.to_vec(),
    }));
    Orchestrator::new(
        store,
        Arc::new(RawVideoBackend::new()),
        pipeline,
        StorageLayout::default(),
    )
    .with_scratch_root(scratch_root)
}

/// Store whose downloads block until released, to hold a worker busy.
pub struct GatedStore {
    pub started: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for GatedStore {
    async fn download_to_file(&self, key: &str, _path: &Path) -> Result<u64, StorageError> {
        self.started.notify_one();
        self.release.notified().await;
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, _key: &str, _body: Bytes, _content_type: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn bucket(&self) -> &str {
        "gated"
    }
}
