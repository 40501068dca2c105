//! Raster frame buffers and stream parameters.

use crate::error::VideoError;

/// Bytes per RGB24 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// Stream parameters copied from the input video to the output video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate numerator
    pub fps_num: u32,
    /// Frame rate denominator
    pub fps_den: u32,
}

impl VideoInfo {
    pub const DEFAULT_FPS: u32 = 30;

    /// Build stream info, substituting the default frame rate when the
    /// container does not report a usable one.
    pub fn new(width: u32, height: u32, fps_num: u32, fps_den: u32) -> Self {
        let (fps_num, fps_den) = if fps_num == 0 || fps_den == 0 {
            (Self::DEFAULT_FPS, 1)
        } else {
            (fps_num, fps_den)
        };

        Self {
            width,
            height,
            fps_num,
            fps_den,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps_num as f64 / self.fps_den as f64
    }

    /// Presentation time of frame `index`, in nanoseconds.
    pub fn frame_pts_ns(&self, index: u64) -> u64 {
        (index as u128 * 1_000_000_000u128 * self.fps_den as u128 / self.fps_num as u128) as u64
    }

    /// Duration of one frame, in nanoseconds.
    pub fn frame_duration_ns(&self) -> u64 {
        self.frame_pts_ns(1)
    }

    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Tightly packed RGB24 image owned by the pipeline for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Create a frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();

        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap packed RGB24 bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, VideoError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(VideoError::Decode(format!(
                "expected {} bytes for {}x{} RGB frame, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Copy RGB24 rows out of a buffer whose rows are padded to `stride` bytes.
    pub fn from_strided_rgb(
        width: u32,
        height: u32,
        stride: usize,
        data: &[u8],
    ) -> Result<Self, VideoError> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes || data.len() < stride * (height as usize).saturating_sub(1) + row_bytes
        {
            return Err(VideoError::Decode(format!(
                "buffer of {} bytes too small for {}x{} RGB frame with stride {}",
                data.len(),
                width,
                height,
                stride
            )));
        }

        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }

        Self::from_rgb(width, height, packed)
    }

    /// Write the rows into a buffer padded to `stride` bytes per row.
    pub fn to_strided_rgb(&self, stride: usize) -> Vec<u8> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if stride == row_bytes {
            return self.data.clone();
        }

        let mut out = vec![0u8; stride * self.height as usize];
        for (row, chunk) in self.data.chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            out[start..start + row_bytes].copy_from_slice(chunk);
        }
        out
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let idx = self.offset(x, y)?;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if let Some(idx) = self.offset(x, y) {
            self.data[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&rgb);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }
}
