//! GStreamer-backed video decode and encode.
//!
//! Decoding runs `filesrc ! decodebin ! videoconvert ! appsink` and pulls RGB
//! samples synchronously; encoding pushes RGB buffers through
//! `appsrc ! videoconvert ! x264enc ! mp4mux ! filesink`.

use super::{FrameSink, FrameSource, VideoBackend};
use crate::error::VideoError;
use crate::frame::{Frame, VideoInfo};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::path::Path;
use tracing::{debug, warn};

/// Video backend using the system GStreamer installation.
#[derive(Debug, Clone, Copy)]
pub struct GstBackend;

impl GstBackend {
    /// Initialize GStreamer. Safe to call more than once.
    pub fn new() -> Result<Self, VideoError> {
        gst::init()
            .map_err(|e| VideoError::Open(format!("GStreamer initialization failed: {}", e)))?;
        Ok(Self)
    }
}

impl VideoBackend for GstBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError> {
        Ok(Box::new(GstSource::open(path)?))
    }

    fn create_sink(&self, path: &Path, info: VideoInfo) -> Result<Box<dyn FrameSink>, VideoError> {
        Ok(Box::new(GstSink::create(path, info)?))
    }

    fn name(&self) -> &str {
        "gstreamer"
    }
}

fn decode_description() -> &'static str {
    "filesrc name=src ! decodebin ! videoconvert \
     ! video/x-raw,format=RGB \
     ! appsink name=sink sync=false max-buffers=4"
}

fn encode_description() -> &'static str {
    "appsrc name=src format=time is-live=false block=true \
     ! videoconvert ! x264enc speed-preset=veryfast tune=zerolatency \
     ! mp4mux ! filesink name=sink"
}

fn path_str(path: &Path) -> Result<&str, String> {
    path.to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))
}

fn launch(description: &str) -> Result<gst::Pipeline, String> {
    gst::parse::launch(description)
        .map_err(|e| e.to_string())?
        .downcast::<gst::Pipeline>()
        .map_err(|_| "Failed to cast to Pipeline".to_string())
}

/// Error message posted on the bus, if any.
fn bus_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
    match msg.view() {
        gst::MessageView::Error(err) => Some(match err.debug() {
            Some(debug) => format!("{} ({})", err.error(), debug),
            None => err.error().to_string(),
        }),
        _ => None,
    }
}

struct SampleLayout {
    width: u32,
    height: u32,
    stride: usize,
}

impl SampleLayout {
    fn from_caps(caps: &gst::CapsRef) -> Result<(Self, VideoInfo), VideoError> {
        let info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|e| VideoError::Decode(format!("unsupported caps: {}", e)))?;
        let fps = info.fps();
        let stream = VideoInfo::new(
            info.width(),
            info.height(),
            fps.numer().max(0) as u32,
            fps.denom().max(0) as u32,
        );
        let layout = Self {
            width: info.width(),
            height: info.height(),
            stride: info.stride()[0].max(0) as usize,
        };
        Ok((layout, stream))
    }

    fn frame(&self, sample: &gst::Sample) -> Result<Frame, VideoError> {
        let buffer = sample
            .buffer()
            .ok_or_else(|| VideoError::Decode("sample without buffer".to_string()))?;
        let map = buffer
            .map_readable()
            .map_err(|e| VideoError::Decode(e.to_string()))?;
        Frame::from_strided_rgb(self.width, self.height, self.stride, map.as_slice())
    }
}

/// Sequential decoder for one input file.
pub struct GstSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    layout: SampleLayout,
    info: VideoInfo,
    pending: Option<Frame>,
    finished: bool,
}

impl GstSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        if !path.is_file() {
            return Err(VideoError::Open(format!("no such file: {}", path.display())));
        }

        let pipeline = launch(decode_description()).map_err(VideoError::Open)?;
        let filesrc = pipeline
            .by_name("src")
            .ok_or_else(|| VideoError::Open("filesrc not found".to_string()))?;
        filesrc.set_property("location", path_str(path).map_err(VideoError::Open)?);

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| VideoError::Open("appsink not found".to_string()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| VideoError::Open("Could not cast to AppSink".to_string()))?;

        let guard = StopOnDrop::new(&pipeline);
        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| VideoError::Open(e.to_string()))?;

        let (layout, info, pending) = Self::read_first(&pipeline, &appsink)?;
        guard.release();

        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps(),
            stride = layout.stride,
            empty = pending.is_none(),
            "Opened input video"
        );

        Ok(Self {
            pipeline,
            appsink,
            layout,
            info,
            finished: pending.is_none(),
            pending,
        })
    }

    /// Pull the first sample to learn the negotiated caps. A stream that
    /// reaches end of stream first still opens, with no pending frame, when
    /// the sink pad has caps.
    fn read_first(
        pipeline: &gst::Pipeline,
        appsink: &gst_app::AppSink,
    ) -> Result<(SampleLayout, VideoInfo, Option<Frame>), VideoError> {
        let first = match appsink.pull_sample() {
            Ok(sample) => Some(sample),
            Err(_) => {
                if let Some(reason) = bus_error(pipeline) {
                    return Err(VideoError::Open(reason));
                }
                None
            }
        };

        let caps = match &first {
            Some(sample) => sample.caps().map(|caps| caps.to_owned()),
            None => appsink
                .static_pad("sink")
                .and_then(|pad| pad.current_caps()),
        }
        .ok_or_else(|| VideoError::Open("stream has no video track".to_string()))?;

        let (layout, info) = SampleLayout::from_caps(&caps)?;
        let pending = match &first {
            Some(sample) => Some(layout.frame(sample)?),
            None => None,
        };
        Ok((layout, info, pending))
    }
}

/// Sets a pipeline to `Null` when dropped, unless released first.
struct StopOnDrop<'a> {
    pipeline: Option<&'a gst::Pipeline>,
}

impl<'a> StopOnDrop<'a> {
    fn new(pipeline: &'a gst::Pipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }

    fn release(mut self) {
        self.pipeline = None;
    }
}

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline {
            let _ = pipeline.set_state(gst::State::Null);
        }
    }
}

impl FrameSource for GstSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        if self.finished {
            return Ok(None);
        }

        match self.appsink.pull_sample() {
            Ok(sample) => self.layout.frame(&sample).map(Some),
            Err(_) => {
                self.finished = true;
                if let Some(reason) = bus_error(&self.pipeline) {
                    return Err(VideoError::Decode(reason));
                }
                if !self.appsink.is_eos() {
                    return Err(VideoError::Decode("appsink stopped before end of stream".to_string()));
                }
                Ok(None)
            }
        }
    }
}

impl Drop for GstSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// H.264/MP4 encoder for one output file.
pub struct GstSink {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    info: VideoInfo,
    stride: usize,
    frames_written: u64,
    finished: bool,
}

impl GstSink {
    pub fn create(path: &Path, info: VideoInfo) -> Result<Self, VideoError> {
        let pipeline = launch(encode_description()).map_err(VideoError::Write)?;
        let filesink = pipeline
            .by_name("sink")
            .ok_or_else(|| VideoError::Write("filesink not found".to_string()))?;
        filesink.set_property("location", path_str(path).map_err(VideoError::Write)?);

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| VideoError::Write("appsrc not found".to_string()))?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| VideoError::Write("Could not cast to AppSrc".to_string()))?;

        let video_info = gst_video::VideoInfo::builder(
            gst_video::VideoFormat::Rgb,
            info.width,
            info.height,
        )
        .fps(gst::Fraction::new(info.fps_num as i32, info.fps_den as i32))
        .build()
        .map_err(|e| VideoError::Write(format!("invalid output format: {}", e)))?;
        let caps = video_info
            .to_caps()
            .map_err(|e| VideoError::Write(e.to_string()))?;

        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| VideoError::Write(e.to_string()))?;

        Ok(Self {
            pipeline,
            appsrc,
            info,
            stride: video_info.stride()[0].max(0) as usize,
            frames_written: 0,
            finished: false,
        })
    }
}

impl FrameSink for GstSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if self.finished {
            return Err(VideoError::Write("stream already finished".to_string()));
        }

        let mut buffer = gst::Buffer::from_mut_slice(frame.to_strided_rgb(self.stride));
        {
            let buffer = buffer
                .get_mut()
                .ok_or_else(|| VideoError::Write("buffer is not writable".to_string()))?;
            buffer.set_pts(gst::ClockTime::from_nseconds(
                self.info.frame_pts_ns(self.frames_written),
            ));
            buffer.set_duration(gst::ClockTime::from_nseconds(self.info.frame_duration_ns()));
        }

        self.appsrc.push_buffer(buffer).map_err(|e| {
            VideoError::Write(bus_error(&self.pipeline).unwrap_or_else(|| format!("{:?}", e)))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.appsrc
            .end_of_stream()
            .map_err(|e| VideoError::Write(format!("{:?}", e)))?;

        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| VideoError::Write("pipeline has no bus".to_string()))?;
        let result = match bus.timed_pop_filtered(
            gst::ClockTime::NONE,
            &[gst::MessageType::Eos, gst::MessageType::Error],
        ) {
            Some(msg) => match msg.view() {
                gst::MessageView::Error(err) => Err(VideoError::Write(err.error().to_string())),
                _ => Ok(()),
            },
            None => Ok(()),
        };

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| VideoError::Write(e.to_string()))?;

        debug!(frames = self.frames_written, "Output video finalized");
        result
    }
}

impl Drop for GstSink {
    fn drop(&mut self) {
        if !self.finished {
            warn!(frames = self.frames_written, "Output video dropped without finish");
        }
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
