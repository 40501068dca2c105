//! Pose Core
//!
//! Per-frame pose-to-angle pipeline for exercise videos. Each decoded frame
//! is handed to a landmark extractor, joint angles are derived from the
//! landmarks, the skeleton and angle readings are drawn onto the frame, and
//! the annotated frame is written to an output stream while the angles are
//! accumulated into a time-series.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource ──▶ LandmarkExtractor ──▶ compute_angles ──▶ annotate ──▶ FrameSink
//!                        │                    │
//!                        │ (no subject)       ▼
//!                        └──────────▶ write unmodified    AngleTimeSeries
//! ```
//!
//! The extractor and the video codec are traits so the pipeline can be
//! driven by GStreamer and an ONNX model in production (features `gst` and
//! `onnx`) and by in-memory fakes in tests.

pub mod annotate;
pub mod error;
pub mod extractor;
pub mod frame;
pub mod geometry;
pub mod landmark;
pub mod pipeline;
pub mod series;
pub mod video;

#[cfg(feature = "onnx")]
pub mod movenet;

pub use annotate::annotate;
pub use error::{ExtractError, GeometryError, PipelineError, SeriesError, VideoError};
pub use extractor::LandmarkExtractor;
pub use frame::{Frame, VideoInfo};
pub use geometry::{angle_at, compute_angles, Joint, JointAngleSet};
pub use landmark::{Landmark, LandmarkPoint, LandmarkSet};
pub use pipeline::{PipelineReport, VideoPipeline};
pub use series::AngleTimeSeries;
pub use video::raw::RawVideoBackend;
pub use video::{FrameSink, FrameSource, VideoBackend};

#[cfg(feature = "gst")]
pub use video::gst::GstBackend;

#[cfg(feature = "onnx")]
pub use movenet::{MoveNetExtractor, MoveNetOptions};
