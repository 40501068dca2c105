//! Anatomical landmarks produced by the extractor for a single frame.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named body landmark of the 33-point pose model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Landmark {
    pub const COUNT: usize = 33;

    /// All landmarks in index order.
    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::Nose,
        Landmark::LeftEyeInner,
        Landmark::LeftEye,
        Landmark::LeftEyeOuter,
        Landmark::RightEyeInner,
        Landmark::RightEye,
        Landmark::RightEyeOuter,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::MouthLeft,
        Landmark::MouthRight,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftPinky,
        Landmark::RightPinky,
        Landmark::LeftIndex,
        Landmark::RightIndex,
        Landmark::LeftThumb,
        Landmark::RightThumb,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
        Landmark::LeftHeel,
        Landmark::RightHeel,
        Landmark::LeftFootIndex,
        Landmark::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Landmark::Nose => "NOSE",
            Landmark::LeftEyeInner => "LEFT_EYE_INNER",
            Landmark::LeftEye => "LEFT_EYE",
            Landmark::LeftEyeOuter => "LEFT_EYE_OUTER",
            Landmark::RightEyeInner => "RIGHT_EYE_INNER",
            Landmark::RightEye => "RIGHT_EYE",
            Landmark::RightEyeOuter => "RIGHT_EYE_OUTER",
            Landmark::LeftEar => "LEFT_EAR",
            Landmark::RightEar => "RIGHT_EAR",
            Landmark::MouthLeft => "MOUTH_LEFT",
            Landmark::MouthRight => "MOUTH_RIGHT",
            Landmark::LeftShoulder => "LEFT_SHOULDER",
            Landmark::RightShoulder => "RIGHT_SHOULDER",
            Landmark::LeftElbow => "LEFT_ELBOW",
            Landmark::RightElbow => "RIGHT_ELBOW",
            Landmark::LeftWrist => "LEFT_WRIST",
            Landmark::RightWrist => "RIGHT_WRIST",
            Landmark::LeftPinky => "LEFT_PINKY",
            Landmark::RightPinky => "RIGHT_PINKY",
            Landmark::LeftIndex => "LEFT_INDEX",
            Landmark::RightIndex => "RIGHT_INDEX",
            Landmark::LeftThumb => "LEFT_THUMB",
            Landmark::RightThumb => "RIGHT_THUMB",
            Landmark::LeftHip => "LEFT_HIP",
            Landmark::RightHip => "RIGHT_HIP",
            Landmark::LeftKnee => "LEFT_KNEE",
            Landmark::RightKnee => "RIGHT_KNEE",
            Landmark::LeftAnkle => "LEFT_ANKLE",
            Landmark::RightAnkle => "RIGHT_ANKLE",
            Landmark::LeftHeel => "LEFT_HEEL",
            Landmark::RightHeel => "RIGHT_HEEL",
            Landmark::LeftFootIndex => "LEFT_FOOT_INDEX",
            Landmark::RightFootIndex => "RIGHT_FOOT_INDEX",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a single landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkPoint {
    /// Normalized X coordinate (0.0 - 1.0)
    pub x: f32,
    /// Normalized Y coordinate (0.0 - 1.0)
    pub y: f32,
    /// Relative depth, if the model provides one
    pub z: Option<f32>,
    /// Visibility / presence score (0.0 - 1.0)
    pub visibility: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility,
        }
    }

    /// Convert to pixel coordinates, truncating toward zero.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f32) as i32;
        let py = (self.y * height as f32) as i32;
        (px, py)
    }
}

/// Landmarks detected on one frame. Extractors may fill any subset.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Option<LandmarkPoint>; Landmark::COUNT],
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self {
            points: [None; Landmark::COUNT],
        }
    }
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, landmark: Landmark, point: LandmarkPoint) {
        self.points[landmark.index()] = Some(point);
    }

    pub fn with(mut self, landmark: Landmark, point: LandmarkPoint) -> Self {
        self.insert(landmark, point);
        self
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.points[landmark.index()].as_ref()
    }

    /// Iterate over the landmarks that are present, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Landmark, &LandmarkPoint)> + '_ {
        Landmark::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(landmark, point)| point.as_ref().map(|p| (*landmark, p)))
    }

    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }
}

impl FromIterator<(Landmark, LandmarkPoint)> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = (Landmark, LandmarkPoint)>>(iter: I) -> Self {
        let mut set = LandmarkSet::new();
        for (landmark, point) in iter {
            set.insert(landmark, point);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_roundtrip() {
        for (i, landmark) in Landmark::ALL.iter().enumerate() {
            assert_eq!(landmark.index(), i);
            assert_eq!(Landmark::from_index(i), Some(*landmark));
        }
        assert_eq!(Landmark::from_index(Landmark::COUNT), None);
    }

    #[test]
    fn test_landmark_serde_name_matches_display() {
        let json = serde_json::to_string(&Landmark::LeftFootIndex).unwrap();
        assert_eq!(json, "\"LEFT_FOOT_INDEX\"");
        assert_eq!(Landmark::LeftFootIndex.to_string(), "LEFT_FOOT_INDEX");
    }

    #[test]
    fn test_to_pixel_truncates() {
        let point = LandmarkPoint::new(0.5, 0.25, 1.0);
        assert_eq!(point.to_pixel(640, 480), (320, 120));

        let point = LandmarkPoint::new(0.999, 0.999, 1.0);
        assert_eq!(point.to_pixel(10, 10), (9, 9));
    }

    #[test]
    fn test_landmark_set_iter_in_index_order() {
        let set = LandmarkSet::new()
            .with(Landmark::RightAnkle, LandmarkPoint::new(0.1, 0.1, 1.0))
            .with(Landmark::Nose, LandmarkPoint::new(0.2, 0.2, 1.0));

        let order: Vec<_> = set.iter().map(|(l, _)| l).collect();
        assert_eq!(order, vec![Landmark::Nose, Landmark::RightAnkle]);
        assert_eq!(set.len(), 2);
        assert!(set.get(Landmark::LeftHip).is_none());
    }

    #[test]
    fn test_empty_set() {
        let set = LandmarkSet::new();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
