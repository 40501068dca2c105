//! Video decode/encode seam.
//!
//! The pipeline reads frames from a [`FrameSource`] and writes them to a
//! [`FrameSink`]; a [`VideoBackend`] opens both from file paths. Two backends
//! ship with the crate:
//!
//! - [`gst::GstBackend`] (feature `gst`): MP4/H.264 through GStreamer.
//! - [`raw::RawVideoBackend`]: uncompressed RGB frames behind a small header,
//!   used by tests and tooling where no codec is installed.

#[cfg(feature = "gst")]
pub mod gst;
pub mod raw;

use crate::error::VideoError;
use crate::frame::{Frame, VideoInfo};
use std::path::Path;

/// Sequential reader over decoded frames.
pub trait FrameSource: Send {
    /// Dimensions and frame rate of the stream.
    fn info(&self) -> VideoInfo;

    /// Next frame in presentation order, or `None` once the stream is
    /// exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// Sequential writer of frames into an output container.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError>;

    /// Flush and close the container. Must be called once after the last
    /// frame; the output is not guaranteed playable otherwise.
    fn finish(&mut self) -> Result<(), VideoError>;
}

/// Opens sources and sinks on the filesystem.
pub trait VideoBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError>;

    /// Create an output stream with the same geometry and frame rate as `info`.
    fn create_sink(&self, path: &Path, info: VideoInfo) -> Result<Box<dyn FrameSink>, VideoError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
