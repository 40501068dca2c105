//! Frame-by-frame pose pipeline.
//!
//! Reads every frame from the source, asks the extractor for landmarks,
//! derives joint angles, draws the overlay and writes the frame to the sink.
//! Frames without a detected subject are written unmodified and add nothing
//! to the time-series, so the output always has as many frames as the input.

use crate::annotate::annotate;
use crate::error::{PipelineError, VideoError};
use crate::extractor::LandmarkExtractor;
use crate::geometry::compute_angles;
use crate::series::AngleTimeSeries;
use crate::video::{FrameSink, FrameSource, VideoBackend};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineReport {
    /// Frames decoded and written
    pub frames_read: u64,
    /// Frames with a detected subject
    pub frames_annotated: u64,
    pub series: AngleTimeSeries,
}

/// Runs the per-frame pose pipeline with a shared extractor.
#[derive(Clone)]
pub struct VideoPipeline {
    extractor: Arc<dyn LandmarkExtractor>,
}

impl VideoPipeline {
    pub fn new(extractor: Arc<dyn LandmarkExtractor>) -> Self {
        Self { extractor }
    }

    /// Open `input`, process every frame into `output`, and finalize it.
    pub fn process_file(
        &self,
        backend: &dyn VideoBackend,
        input: &Path,
        output: &Path,
    ) -> Result<PipelineReport, PipelineError> {
        let mut source = backend.open_source(input)?;
        let info = source.info();
        let mut sink = backend.create_sink(output, info)?;

        info!(
            backend = backend.name(),
            extractor = self.extractor.name(),
            width = info.width,
            height = info.height,
            fps = info.fps(),
            "Processing video"
        );

        let report = self.run(source.as_mut(), sink.as_mut())?;
        sink.finish()?;
        Ok(report)
    }

    /// Drain `source` into `sink`. The sink is not finished.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();
        let mut report = PipelineReport::default();

        loop {
            let mut frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(VideoError::Decode(reason)) => {
                    // An unreadable frame ends the stream; what was read is kept.
                    warn!(
                        frame = report.frames_read,
                        error = %reason,
                        "Frame unreadable, closing stream"
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(landmarks) = self.extractor.extract(&frame)? {
                let angles = compute_angles(&landmarks)?;
                annotate(&mut frame, &landmarks, &angles);
                report.series.push(angles);
                report.frames_annotated += 1;
            } else {
                trace!(frame = report.frames_read, "No subject detected");
            }

            sink.write_frame(&frame)?;
            report.frames_read += 1;

            if report.frames_read % 100 == 0 {
                debug!(
                    frames = report.frames_read,
                    annotated = report.frames_annotated,
                    "Pipeline progress"
                );
            }
        }

        info!(
            frames_read = report.frames_read,
            frames_annotated = report.frames_annotated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Pipeline complete"
        );

        Ok(report)
    }
}

impl std::fmt::Debug for VideoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPipeline")
            .field("extractor", &self.extractor.name())
            .finish()
    }
}
