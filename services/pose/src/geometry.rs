//! Joint angle geometry.
//!
//! Angles are measured in the image plane (depth is ignored) and are always
//! finite values in `[0, 180]`. Degenerate input yields `0.0`, which callers
//! cannot distinguish from a true zero-degree angle; the JSON output keeps
//! that encoding.

use crate::error::GeometryError;
use crate::landmark::{Landmark, LandmarkSet};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Angle at `vertex` between the rays towards `a` and `b`, in degrees.
///
/// Returns `0.0` when either ray has zero length, or when the cosine is NaN
/// or overshoots `[-1, 1]` through rounding. Never panics.
pub fn angle_at(vertex: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let v1 = [a[0] - vertex[0], a[1] - vertex[1]];
    let v2 = [b[0] - vertex[0], b[1] - vertex[1]];

    let norm_v1 = v1[0].hypot(v1[1]);
    let norm_v2 = v2[0].hypot(v2[1]);

    if norm_v1 == 0.0 || norm_v2 == 0.0 {
        return 0.0;
    }

    let cosine = (v1[0] * v2[0] + v1[1] * v2[1]) / (norm_v1 * norm_v2);

    if cosine.is_nan() || !(-1.0..=1.0).contains(&cosine) {
        return 0.0;
    }

    let degrees = cosine.acos().to_degrees();
    if degrees.is_finite() {
        degrees
    } else {
        0.0
    }
}

/// Joints for which an angle is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Joint {
    LeftElbow,
    RightElbow,
    LeftKnee,
    RightKnee,
    LeftHip,
    RightHip,
}

impl Joint {
    pub const COUNT: usize = 6;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftHip,
        Joint::RightHip,
    ];

    /// `(vertex, a, b)` landmarks that define this joint's angle.
    pub fn triple(self) -> (Landmark, Landmark, Landmark) {
        match self {
            Joint::LeftElbow => (
                Landmark::LeftElbow,
                Landmark::LeftShoulder,
                Landmark::LeftWrist,
            ),
            Joint::RightElbow => (
                Landmark::RightElbow,
                Landmark::RightShoulder,
                Landmark::RightWrist,
            ),
            Joint::LeftKnee => (Landmark::LeftKnee, Landmark::LeftHip, Landmark::LeftAnkle),
            Joint::RightKnee => (
                Landmark::RightKnee,
                Landmark::RightHip,
                Landmark::RightAnkle,
            ),
            Joint::LeftHip => (Landmark::LeftHip, Landmark::LeftShoulder, Landmark::Nose),
            Joint::RightHip => (Landmark::RightHip, Landmark::RightShoulder, Landmark::Nose),
        }
    }

    /// Landmark the angle label is anchored to.
    pub fn landmark(self) -> Landmark {
        self.triple().0
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One angle per [`Joint`], in degrees. `0.0` may mean "undefined".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointAngleSet {
    angles: [f64; Joint::COUNT],
}

impl JointAngleSet {
    pub fn new(angles: [f64; Joint::COUNT]) -> Self {
        Self { angles }
    }

    pub fn get(&self, joint: Joint) -> f64 {
        self.angles[joint.index()]
    }

    pub fn set(&mut self, joint: Joint, degrees: f64) {
        self.angles[joint.index()] = degrees;
    }

    /// Iterate in [`Joint::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        Joint::ALL.iter().map(move |joint| (*joint, self.get(*joint)))
    }

    pub fn len(&self) -> usize {
        Joint::COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Compute every joint angle from a landmark set.
pub fn compute_angles(landmarks: &LandmarkSet) -> Result<JointAngleSet, GeometryError> {
    let point = |landmark: Landmark| {
        landmarks
            .get(landmark)
            .map(|p| [p.x as f64, p.y as f64])
            .ok_or(GeometryError::MissingLandmark(landmark))
    };

    let mut angles = JointAngleSet::default();
    for joint in Joint::ALL {
        let (vertex, a, b) = joint.triple();
        angles.set(joint, angle_at(point(vertex)?, point(a)?, point(b)?));
    }

    Ok(angles)
}

impl Serialize for JointAngleSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(Joint::COUNT))?;
        for (joint, degrees) in self.iter() {
            map.serialize_entry(&joint, &degrees)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JointAngleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AngleSetVisitor;

        impl<'de> Visitor<'de> for AngleSetVisitor {
            type Value = JointAngleSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from joint name to degrees")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut angles: [Option<f64>; Joint::COUNT] = [None; Joint::COUNT];
                while let Some((joint, degrees)) = access.next_entry::<Joint, f64>()? {
                    angles[joint.index()] = Some(degrees);
                }

                let mut set = JointAngleSet::default();
                for joint in Joint::ALL {
                    let degrees = angles[joint.index()].ok_or_else(|| {
                        de::Error::custom(format!("missing joint {:?}", joint))
                    })?;
                    set.set(joint, degrees);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(AngleSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::LandmarkPoint;

    const EPS: f64 = 1e-9;

    fn full_pose() -> LandmarkSet {
        // Left arm hanging, right forearm horizontal, legs straight.
        LandmarkSet::new()
            .with(Landmark::Nose, LandmarkPoint::new(0.5, 0.1, 1.0))
            .with(Landmark::LeftShoulder, LandmarkPoint::new(0.6, 0.3, 1.0))
            .with(Landmark::RightShoulder, LandmarkPoint::new(0.4, 0.3, 1.0))
            .with(Landmark::LeftElbow, LandmarkPoint::new(0.6, 0.4, 1.0))
            .with(Landmark::RightElbow, LandmarkPoint::new(0.4, 0.4, 1.0))
            .with(Landmark::LeftWrist, LandmarkPoint::new(0.6, 0.5, 1.0))
            .with(Landmark::RightWrist, LandmarkPoint::new(0.3, 0.4, 1.0))
            .with(Landmark::LeftHip, LandmarkPoint::new(0.6, 0.6, 1.0))
            .with(Landmark::RightHip, LandmarkPoint::new(0.4, 0.6, 1.0))
            .with(Landmark::LeftKnee, LandmarkPoint::new(0.6, 0.75, 1.0))
            .with(Landmark::RightKnee, LandmarkPoint::new(0.4, 0.75, 1.0))
            .with(Landmark::LeftAnkle, LandmarkPoint::new(0.6, 0.9, 1.0))
            .with(Landmark::RightAnkle, LandmarkPoint::new(0.4, 0.9, 1.0))
    }

    #[test]
    fn test_right_angle() {
        assert!((angle_at([0.0, 0.0], [1.0, 0.0], [0.0, 1.0]) - 90.0).abs() < EPS);
    }

    #[test]
    fn test_collinear_same_direction() {
        assert_eq!(angle_at([0.0, 0.0], [1.0, 0.0], [2.0, 0.0]), 0.0);
    }

    #[test]
    fn test_collinear_opposite_direction() {
        assert!((angle_at([0.0, 0.0], [1.0, 0.0], [-1.0, 0.0]) - 180.0).abs() < EPS);
    }

    #[test]
    fn test_coincident_vertex_is_zero() {
        assert_eq!(angle_at([0.3, 0.7], [0.3, 0.7], [1.0, 1.0]), 0.0);
        assert_eq!(angle_at([0.3, 0.7], [1.0, 1.0], [0.3, 0.7]), 0.0);
    }

    #[test]
    fn test_symmetric_in_endpoints() {
        let cases = [
            ([0.1, 0.2], [0.5, 0.9], [0.7, 0.3]),
            ([0.5, 0.5], [0.0, 0.0], [1.0, 0.1]),
            ([-3.0, 2.0], [4.0, -1.0], [0.0, 7.5]),
        ];
        for (v, a, b) in cases {
            let forward = angle_at(v, a, b);
            let backward = angle_at(v, b, a);
            assert!((forward - backward).abs() < EPS);
            assert!((0.0..=180.0).contains(&forward));
        }
    }

    #[test]
    fn test_near_collinear_stays_in_range() {
        // Tiny offsets push the cosine to the edge of [-1, 1].
        let cases = [
            ([0.1, 0.1], [0.3, 0.3 + 1e-17], [0.7, 0.7]),
            ([0.1, 0.1], [0.3, 0.3], [-0.7, -0.7 + 1e-17]),
            ([1e-300, 0.0], [2e-300, 0.0], [3e-300, 1e-310]),
            ([1e150, 1e150], [-1e150, 3e150], [5e150, -2e150]),
        ];
        for (v, a, b) in cases {
            let angle = angle_at(v, a, b);
            assert!(angle.is_finite());
            assert!((0.0..=180.0).contains(&angle), "angle {angle} out of range");
        }
    }

    #[test]
    fn test_compute_angles_uses_fixed_triples() {
        let angles = compute_angles(&full_pose()).unwrap();

        // Straight left arm and legs
        assert!((angles.get(Joint::LeftElbow) - 180.0).abs() < 1e-4);
        assert!((angles.get(Joint::LeftKnee) - 180.0).abs() < 1e-4);
        assert!((angles.get(Joint::RightKnee) - 180.0).abs() < 1e-4);
        // Right forearm held horizontally
        assert!((angles.get(Joint::RightElbow) - 90.0).abs() < 1e-4);
        assert_eq!(angles.len(), Joint::COUNT);
        for (_, degrees) in angles.iter() {
            assert!((0.0..=180.0).contains(&degrees));
        }
    }

    #[test]
    fn test_compute_angles_missing_landmark() {
        let pose: LandmarkSet = full_pose()
            .iter()
            .filter(|(l, _)| *l != Landmark::Nose)
            .map(|(l, p)| (l, *p))
            .collect();

        assert_eq!(
            compute_angles(&pose),
            Err(GeometryError::MissingLandmark(Landmark::Nose))
        );
    }

    #[test]
    fn test_angle_set_serializes_as_named_map() {
        let angles = JointAngleSet::new([1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
        let value = serde_json::to_value(angles).unwrap();

        assert_eq!(value["LEFT_ELBOW"], 1.0);
        assert_eq!(value["RIGHT_HIP"], 0.0);
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_angle_set_rejects_incomplete_map() {
        let json = r#"{"LEFT_ELBOW": 10.0, "RIGHT_ELBOW": 20.0}"#;
        assert!(serde_json::from_str::<JointAngleSet>(json).is_err());
    }
}
