//! MoveNet single-pose landmark extractor on ONNX Runtime.
//!
//! The model takes a `[1, 192, 192, 3]` f32 tensor with raw 0-255 RGB values
//! and returns `[1, 1, 17, 3]` as `(y, x, score)` per COCO keypoint, with
//! coordinates normalized to the input square. Because the frame is
//! stretched to the square, those coordinates map directly onto the frame.

use crate::error::ExtractError;
use crate::extractor::LandmarkExtractor;
use crate::frame::{Frame, BYTES_PER_PIXEL};
use crate::landmark::{Landmark, LandmarkPoint, LandmarkSet};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const INPUT_SIZE: u32 = 192;
pub const KEYPOINT_COUNT: usize = 17;

const INPUT_NAME: &str = "serving_default_input_0";
const OUTPUT_NAME: &str = "StatefulPartitionedCall_0";

/// COCO keypoint order of the model output.
pub const KEYPOINTS: [Landmark; KEYPOINT_COUNT] = [
    Landmark::Nose,
    Landmark::LeftEye,
    Landmark::RightEye,
    Landmark::LeftEar,
    Landmark::RightEar,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftElbow,
    Landmark::RightElbow,
    Landmark::LeftWrist,
    Landmark::RightWrist,
    Landmark::LeftHip,
    Landmark::RightHip,
    Landmark::LeftKnee,
    Landmark::RightKnee,
    Landmark::LeftAnkle,
    Landmark::RightAnkle,
];

/// Model loading options.
#[derive(Debug, Clone)]
pub struct MoveNetOptions {
    /// Mean keypoint score below which the frame counts as having no subject
    pub min_pose_confidence: f32,
    /// ONNX Runtime intra-op threads; 0 lets the runtime decide
    pub intra_threads: usize,
}

impl Default for MoveNetOptions {
    fn default() -> Self {
        Self {
            min_pose_confidence: 0.3,
            intra_threads: 0,
        }
    }
}

/// Landmark extractor backed by a MoveNet ONNX model.
///
/// The session is held behind a mutex: inference calls from concurrent
/// workers are serialized, so one instance can be shared across jobs.
pub struct MoveNetExtractor {
    session: Mutex<Session>,
    options: MoveNetOptions,
}

impl MoveNetExtractor {
    pub fn load<P: AsRef<Path>>(model_path: P, options: MoveNetOptions) -> Result<Self, ExtractError> {
        let model_path = model_path.as_ref();
        let load_err = |e: &dyn fmt::Display| ExtractError::ModelLoad(format!("{}: {}", model_path.display(), e));

        let mut builder = Session::builder()
            .map_err(|e| load_err(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(&e))?;
        if options.intra_threads > 0 {
            builder = builder
                .with_intra_threads(options.intra_threads)
                .map_err(|e| load_err(&e))?;
        }
        let session = builder.commit_from_file(model_path).map_err(|e| load_err(&e))?;

        info!(
            model = %model_path.display(),
            min_pose_confidence = options.min_pose_confidence,
            "Loaded MoveNet model"
        );

        Ok(Self {
            session: Mutex::new(session),
            options,
        })
    }

    fn infer(&self, input: Array4<f32>) -> Result<[[f32; 3]; KEYPOINT_COUNT], ExtractError> {
        let infer_err = |e: &dyn fmt::Display| ExtractError::Inference(e.to_string());

        let tensor = Tensor::from_array(input).map_err(|e| infer_err(&e))?;
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![INPUT_NAME => tensor])
            .map_err(|e| infer_err(&e))?;
        let output: ndarray::ArrayViewD<f32> = outputs[OUTPUT_NAME]
            .try_extract_array()
            .map_err(|e| infer_err(&e))?;

        if output.shape() != [1, 1, KEYPOINT_COUNT, 3] {
            return Err(ExtractError::Inference(format!(
                "unexpected output shape {:?}",
                output.shape()
            )));
        }

        let mut keypoints = [[0.0f32; 3]; KEYPOINT_COUNT];
        for (i, keypoint) in keypoints.iter_mut().enumerate() {
            *keypoint = [
                output[[0, 0, i, 0]],
                output[[0, 0, i, 1]],
                output[[0, 0, i, 2]],
            ];
        }
        Ok(keypoints)
    }
}

impl LandmarkExtractor for MoveNetExtractor {
    fn extract(&self, frame: &Frame) -> Result<Option<LandmarkSet>, ExtractError> {
        let input = input_tensor(frame)?;
        let keypoints = self.infer(input)?;
        let landmarks = to_landmarks(&keypoints, self.options.min_pose_confidence);
        if landmarks.is_none() {
            debug!("Pose confidence below threshold");
        }
        Ok(landmarks)
    }

    fn name(&self) -> &str {
        "movenet"
    }
}

/// Nearest-neighbour resize to the model's square input.
pub fn resize_nearest(frame: &Frame, size: u32) -> Vec<u8> {
    let (src_width, src_height) = (frame.width(), frame.height());
    let data = frame.data();
    let mut output = vec![0u8; (size * size) as usize * BYTES_PER_PIXEL];

    let x_ratio = src_width as f32 / size as f32;
    let y_ratio = src_height as f32 / size as f32;

    for y in 0..size {
        let src_y = ((y as f32 * y_ratio) as u32).min(src_height - 1);
        for x in 0..size {
            let src_x = ((x as f32 * x_ratio) as u32).min(src_width - 1);
            let src_idx = (src_y * src_width + src_x) as usize * BYTES_PER_PIXEL;
            let dst_idx = (y * size + x) as usize * BYTES_PER_PIXEL;
            output[dst_idx..dst_idx + BYTES_PER_PIXEL]
                .copy_from_slice(&data[src_idx..src_idx + BYTES_PER_PIXEL]);
        }
    }

    output
}

fn input_tensor(frame: &Frame) -> Result<Array4<f32>, ExtractError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(ExtractError::InvalidFrame("empty frame".to_string()));
    }

    let pixels = resize_nearest(frame, INPUT_SIZE);
    let side = INPUT_SIZE as usize;
    Array4::from_shape_vec(
        (1, side, side, BYTES_PER_PIXEL),
        pixels.into_iter().map(f32::from).collect(),
    )
    .map_err(|e| ExtractError::InvalidFrame(e.to_string()))
}

/// Map `(y, x, score)` keypoints onto landmarks, or `None` when the mean
/// score is below `min_confidence`.
pub fn to_landmarks(
    keypoints: &[[f32; 3]; KEYPOINT_COUNT],
    min_confidence: f32,
) -> Option<LandmarkSet> {
    let mean = keypoints.iter().map(|k| k[2]).sum::<f32>() / KEYPOINT_COUNT as f32;
    if mean < min_confidence {
        return None;
    }

    Some(
        KEYPOINTS
            .iter()
            .zip(keypoints.iter())
            .map(|(landmark, [y, x, score])| (*landmark, LandmarkPoint::new(*x, *y, *score)))
            .collect(),
    )
}
