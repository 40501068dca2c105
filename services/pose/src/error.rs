//! Error types shared across the pose pipeline.

use crate::landmark::Landmark;
use thiserror::Error;

/// Errors raised while deriving joint angles.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Missing landmark required for angle computation: {0}")]
    MissingLandmark(Landmark),
}

/// Errors raised by video decode/encode backends.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Failed to open input video: {0}")]
    Open(String),

    #[error("Failed to write output video: {0}")]
    Write(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),
}

/// Errors raised by a landmark extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Landmark model failed to load: {0}")]
    ModelLoad(String),

    #[error("Landmark inference failed: {0}")]
    Inference(String),

    #[error("Frame not usable for inference: {0}")]
    InvalidFrame(String),
}

/// Errors raised while (de)serializing an angle time-series.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Time-series JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a video pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
