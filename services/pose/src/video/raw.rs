//! Uncompressed RGB video container.
//!
//! Layout: the magic `RGBV`, then width, height, frame-rate numerator and
//! denominator as little-endian `u32`, then packed RGB24 frames back to back.

use super::{FrameSink, FrameSource, VideoBackend};
use crate::error::VideoError;
use crate::frame::{Frame, VideoInfo};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"RGBV";
pub const HEADER_LEN: usize = 20;

/// Backend reading and writing the raw container.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawVideoBackend;

impl RawVideoBackend {
    pub fn new() -> Self {
        Self
    }
}

impl VideoBackend for RawVideoBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, VideoError> {
        let bytes = std::fs::read(path)
            .map_err(|e| VideoError::Open(format!("{}: {}", path.display(), e)))?;
        let source = RawSource::from_bytes(bytes)?;
        debug!(path = %path.display(), info = ?source.info, "Opened raw video");
        Ok(Box::new(source))
    }

    fn create_sink(&self, path: &Path, info: VideoInfo) -> Result<Box<dyn FrameSink>, VideoError> {
        let file = File::create(path)
            .map_err(|e| VideoError::Write(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&encode_header(info))
            .map_err(|e| VideoError::Write(e.to_string()))?;
        Ok(Box::new(RawSink {
            info,
            writer: Some(writer),
        }))
    }

    fn name(&self) -> &str {
        "raw"
    }
}

/// Frames decoded from an in-memory raw container.
#[derive(Debug)]
pub struct RawSource {
    info: VideoInfo,
    bytes: Vec<u8>,
    cursor: usize,
}

impl RawSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, VideoError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(VideoError::Open("not a raw RGB video".to_string()));
        }

        let field = |i: usize| {
            let start = 4 + i * 4;
            u32::from_le_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };
        let info = VideoInfo::new(field(0), field(1), field(2), field(3));

        if info.frame_size() == 0 {
            return Err(VideoError::Open(format!(
                "invalid dimensions {}x{}",
                info.width, info.height
            )));
        }

        Ok(Self {
            info,
            bytes,
            cursor: HEADER_LEN,
        })
    }
}

impl FrameSource for RawSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let remaining = self.bytes.len() - self.cursor;
        if remaining == 0 {
            return Ok(None);
        }

        let size = self.info.frame_size();
        if remaining < size {
            return Err(VideoError::Decode(format!(
                "truncated frame: {} of {} bytes",
                remaining, size
            )));
        }

        let data = self.bytes[self.cursor..self.cursor + size].to_vec();
        self.cursor += size;
        Frame::from_rgb(self.info.width, self.info.height, data).map(Some)
    }
}

struct RawSink {
    info: VideoInfo,
    writer: Option<BufWriter<File>>,
}

impl FrameSink for RawSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(VideoError::Write(format!(
                "frame is {}x{}, stream is {}x{}",
                frame.width(),
                frame.height(),
                self.info.width,
                self.info.height
            )));
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VideoError::Write("stream already finished".to_string()))?;
        writer
            .write_all(frame.data())
            .map_err(|e| VideoError::Write(e.to_string()))
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        match self.writer.take() {
            Some(mut writer) => writer.flush().map_err(|e| VideoError::Write(e.to_string())),
            None => Ok(()),
        }
    }
}

fn encode_header(info: VideoInfo) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(MAGIC);
    for (i, value) in [info.width, info.height, info.fps_num, info.fps_den]
        .into_iter()
        .enumerate()
    {
        header[4 + i * 4..8 + i * 4].copy_from_slice(&value.to_le_bytes());
    }
    header
}

/// Serialize frames into a raw container held in memory.
pub fn encode(info: VideoInfo, frames: &[Frame]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + frames.len() * info.frame_size());
    out.extend_from_slice(&encode_header(info));
    for frame in frames {
        out.extend_from_slice(frame.data());
    }
    out
}

/// Parse a raw container held in memory.
pub fn decode(bytes: &[u8]) -> Result<(VideoInfo, Vec<Frame>), VideoError> {
    let mut source = RawSource::from_bytes(bytes.to_vec())?;
    let mut frames = Vec::new();
    while let Some(frame) = source.next_frame()? {
        frames.push(frame);
    }
    Ok((source.info, frames))
}
